// Android picker facility
//
// Submissions are static JNI calls onto the picker plugin class, resolved
// through the application class loader. The plugin answers through
// `nativeCallback`, which feeds the registry installed by the active picker.

use crate::config::PickerConfig;
use crate::error::PickerError;
use crate::facility::{DebugLevel, PickerFacility};
use crate::registry::CallbackRegistry;
use jni::objects::{JClass, JObject, JString, JValue};
use jni::JNIEnv;
use ndk_context::android_context;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

static DISPATCHER: Mutex<Option<Arc<CallbackRegistry>>> = Mutex::new(None);

/// Routes plugin callbacks to `registry` from now on
pub fn install_dispatcher(registry: Arc<CallbackRegistry>) {
    if let Ok(mut slot) = DISPATCHER.lock() {
        if slot.replace(registry).is_some() {
            log::warn!("Replacing previously installed picker dispatcher");
        }
    }
}

fn jni_error(what: &'static str) -> impl Fn(jni::errors::Error) -> PickerError {
    move |e| PickerError::Facility(format!("{} failed: {}", what, e))
}

fn get_app_class_loader<'a>(env: &mut JNIEnv<'a>) -> Result<JObject<'a>, PickerError> {
    // ActivityThread.currentActivityThread()
    let at_cls = env
        .find_class("android/app/ActivityThread")
        .map_err(jni_error("ActivityThread lookup"))?;
    let at = env
        .call_static_method(
            &at_cls,
            "currentActivityThread",
            "()Landroid/app/ActivityThread;",
            &[],
        )
        .map_err(jni_error("currentActivityThread"))?
        .l()
        .map_err(jni_error("currentActivityThread result"))?;

    // Prefer application class loader
    let app = env
        .call_method(&at, "getApplication", "()Landroid/app/Application;", &[])
        .map_err(jni_error("getApplication"))?
        .l()
        .map_err(jni_error("getApplication result"))?;

    let context = if app.is_null() {
        // Fallback: system context
        env.call_method(&at, "getSystemContext", "()Landroid/app/ContextImpl;", &[])
            .map_err(jni_error("getSystemContext"))?
            .l()
            .map_err(jni_error("getSystemContext result"))?
    } else {
        app
    };

    env.call_method(&context, "getClassLoader", "()Ljava/lang/ClassLoader;", &[])
        .map_err(jni_error("getClassLoader"))?
        .l()
        .map_err(jni_error("getClassLoader result"))
}

fn load_class<'a>(
    env: &mut JNIEnv<'a>,
    loader: &JObject<'a>,
    fq_slash: &str,
) -> Result<JClass<'a>, PickerError> {
    // com/ElicitIce/Plugin/ImagePicker -> com.ElicitIce.Plugin.ImagePicker for ClassLoader.loadClass
    let fq_dot = fq_slash.replace('/', ".");
    let name = JObject::from(env.new_string(fq_dot).map_err(jni_error("new_string"))?);
    let cls_obj = env
        .call_method(
            loader,
            "loadClass",
            "(Ljava/lang/String;)Ljava/lang/Class;",
            &[JValue::Object(&name)],
        )
        .map_err(jni_error("ClassLoader.loadClass"))?
        .l()
        .map_err(jni_error("loadClass result"))?;
    Ok(JClass::from(cls_obj))
}

fn into_string(env: &mut JNIEnv<'_>, obj: JObject<'_>) -> Result<Option<String>, PickerError> {
    if obj.is_null() {
        return Ok(None);
    }
    let jstr = JString::from(obj);
    let value: String = env
        .get_string(&jstr)
        .map_err(jni_error("String conversion"))?
        .into();
    Ok(Some(value))
}

/// Picker facility backed by the Java plugin
pub struct AndroidFacility {
    plugin_class: String,
}

impl AndroidFacility {
    pub fn new(config: &PickerConfig) -> Self {
        Self {
            plugin_class: config.plugin_class.clone(),
        }
    }

    fn with_plugin<T, F>(&self, f: F) -> Result<T, PickerError>
    where
        F: for<'local> FnOnce(&mut JNIEnv<'local>, &JClass<'local>) -> Result<T, PickerError>,
    {
        let vm_ptr = android_context().vm() as *mut *const jni::sys::JNIInvokeInterface_;
        let vm = unsafe { jni::JavaVM::from_raw(vm_ptr) }.map_err(jni_error("JavaVM"))?;
        let mut env = vm
            .attach_current_thread()
            .map_err(jni_error("JNI attach"))?;

        let loader = get_app_class_loader(&mut env)?;
        let cls = load_class(&mut env, &loader, &self.plugin_class)?;
        let result = f(&mut env, &cls);

        if env.exception_check().unwrap_or(false) {
            let _ = env.exception_describe();
            let _ = env.exception_clear();
        }
        result
    }

    fn submit(&self, method: &'static str, settings: &str) -> Result<(), PickerError> {
        log::debug!("{}({})", method, settings);
        self.with_plugin(|env, cls| {
            let blob = JObject::from(env.new_string(settings).map_err(jni_error("new_string"))?);
            env.call_static_method(
                cls,
                method,
                "(Ljava/lang/String;)V",
                &[JValue::Object(&blob)],
            )
            .map_err(jni_error(method))?;
            Ok(())
        })
    }

    fn static_string(&self, method: &'static str) -> Result<Option<String>, PickerError> {
        self.with_plugin(|env, cls| {
            let obj = env
                .call_static_method(cls, method, "()Ljava/lang/String;", &[])
                .map_err(jni_error(method))?
                .l()
                .map_err(jni_error(method))?;
            into_string(env, obj)
        })
    }
}

impl PickerFacility for AndroidFacility {
    fn select_image(&self, settings: &str) -> Result<(), PickerError> {
        self.submit("selectImage", settings)
    }

    fn receive_file(&self, settings: &str, index: usize) -> Result<(), PickerError> {
        log::debug!("receiveFile({}, {})", settings, index);
        self.with_plugin(|env, cls| {
            let blob = JObject::from(env.new_string(settings).map_err(jni_error("new_string"))?);
            env.call_static_method(
                cls,
                "receiveFile",
                "(Ljava/lang/String;I)V",
                &[JValue::Object(&blob), JValue::Int(index as i32)],
            )
            .map_err(jni_error("receiveFile"))?;
            Ok(())
        })
    }

    fn receive_all_files(&self, settings: &str) -> Result<(), PickerError> {
        self.submit("receiveAllFiles", settings)
    }

    fn open_file(&self, settings: &str, path: &str) -> Result<(), PickerError> {
        log::debug!("openFile({}, {})", settings, path);
        self.with_plugin(|env, cls| {
            let blob = JObject::from(env.new_string(settings).map_err(jni_error("new_string"))?);
            let file = JObject::from(env.new_string(path).map_err(jni_error("new_string"))?);
            env.call_static_method(
                cls,
                "openFile",
                "(Ljava/lang/String;Ljava/lang/String;)V",
                &[JValue::Object(&blob), JValue::Object(&file)],
            )
            .map_err(jni_error("openFile"))?;
            Ok(())
        })
    }

    fn received_count(&self) -> Result<usize, PickerError> {
        self.with_plugin(|env, cls| {
            let count = env
                .call_static_method(cls, "getReceivedCount", "()I", &[])
                .map_err(jni_error("getReceivedCount"))?
                .i()
                .map_err(jni_error("getReceivedCount result"))?;
            Ok(count.max(0) as usize)
        })
    }

    fn received_path(&self, index: usize) -> Result<Option<String>, PickerError> {
        self.with_plugin(|env, cls| {
            let obj = env
                .call_static_method(
                    cls,
                    "getReceivedPath",
                    "(I)Ljava/lang/String;",
                    &[JValue::Int(index as i32)],
                )
                .map_err(jni_error("getReceivedPath"))?
                .l()
                .map_err(jni_error("getReceivedPath result"))?;
            into_string(env, obj)
        })
    }

    fn remove_received_entry(&self, index: usize, count: usize) -> Result<(), PickerError> {
        self.with_plugin(|env, cls| {
            env.call_static_method(
                cls,
                "removeReceivedEntry",
                "(II)V",
                &[JValue::Int(index as i32), JValue::Int(count as i32)],
            )
            .map_err(jni_error("removeReceivedEntry"))?;
            Ok(())
        })
    }

    fn debug_level(&self) -> Result<DebugLevel, PickerError> {
        self.with_plugin(|env, cls| {
            let level = env
                .get_static_field(cls, "debug", "I")
                .map_err(jni_error("debug field"))?
                .i()
                .map_err(jni_error("debug field value"))?;
            Ok(DebugLevel::from_i32(level))
        })
    }

    fn set_debug_level(&self, level: DebugLevel) -> Result<(), PickerError> {
        self.with_plugin(|env, cls| {
            env.set_static_field(cls, (cls, "debug", "I"), JValue::Int(level.as_i32()))
                .map_err(jni_error("set debug field"))
        })
    }

    fn external_dir(&self) -> Result<PathBuf, PickerError> {
        self.static_string("getExternalDir")?
            .map(PathBuf::from)
            .ok_or_else(|| PickerError::Facility("getExternalDir returned null".to_string()))
    }

    fn internal_dir(&self) -> Result<PathBuf, PickerError> {
        self.static_string("getFileDir")?
            .map(PathBuf::from)
            .ok_or_else(|| PickerError::Facility("getFileDir returned null".to_string()))
    }
}

fn read_arg(env: &mut JNIEnv<'_>, value: JString<'_>) -> Option<String> {
    into_string(env, JObject::from(value)).unwrap_or_else(|e| {
        log::error!("Picker callback argument unreadable: {}", e);
        None
    })
}

/// Called by the plugin for every result, addressed by owner and method name
#[no_mangle]
pub extern "system" fn Java_com_ElicitIce_Plugin_ImagePicker_nativeCallback<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    owner: JString<'local>,
    method: JString<'local>,
    payload: JString<'local>,
) {
    let owner = read_arg(&mut env, owner).unwrap_or_default();
    let method = read_arg(&mut env, method).unwrap_or_default();
    let payload = read_arg(&mut env, payload);

    let registry = match DISPATCHER.lock() {
        Ok(slot) => slot.clone(),
        Err(_) => None,
    };
    match registry {
        Some(registry) => {
            if let Err(e) = registry.dispatch(&owner, &method, payload) {
                log::warn!("Dropped picker callback {}: {}", method, e);
            }
        }
        None => log::error!("Picker callback {} arrived before a picker was created", method),
    }
}
