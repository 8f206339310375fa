use std::sync::RwLock;

type WarningFunction = fn(&str, MlDataWarning);
static WARNING_FUNCTION: RwLock<Option<WarningFunction>> = RwLock::new(None);

/// Set the function that will be called by the `mldata_warn!` macro.
/// Callers use this to route warnings into their own reporting.
pub fn set_warning_function(function: WarningFunction) {
    let mut slot = WARNING_FUNCTION
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    *slot = Some(function);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MlDataWarning {
    UserWarning,
    /// Categorical values not present in a frozen indexer were mapped to the
    /// unknown index.
    UnseenCategoryWarning,
}

fn eprintln(fmt: &str, warning: MlDataWarning) {
    eprintln!("{:?}: {}", warning, fmt);
}

pub fn get_warning_function() -> WarningFunction {
    WARNING_FUNCTION
        .read()
        .map(|slot| *slot)
        .unwrap_or_else(|poisoned| *poisoned.into_inner())
        .unwrap_or(eprintln)
}

#[macro_export]
macro_rules! mldata_warn {
    ($variant:ident, $fmt:literal $(, $arg:expr)* $(,)?) => {
        {{
        let func = $crate::get_warning_function();
        let warn = $crate::MlDataWarning::$variant;
        func(format!($fmt, $($arg),*).as_ref(), warn)
        }}
    };
    ($fmt:literal $(, $arg:expr)+ $(,)?) => {
        {{
        let func = $crate::get_warning_function();
        func(format!($fmt, $($arg),+).as_ref(), $crate::MlDataWarning::UserWarning)
        }}
    };
    ($msg:expr) => {
        $crate::mldata_warn!("{}", $msg)
    };
}
