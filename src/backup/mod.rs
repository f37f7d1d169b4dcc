pub mod backup_config;
pub mod coordinator;
pub mod copy;
pub mod exclude;
pub mod record;
pub mod report;
pub mod result_error;
pub mod stats;
pub mod validate;
pub mod walker;

macro_rules! function_path {
    () => {
        concat!(module_path!(), "::", function_name!(), " ", file!(), ":", line!())
    };
}

pub(crate) use function_path;
