//! Single-device selection policy
//!
//! Every operation that talks to hardware goes through [`select_one`] first,
//! so no request is ever issued while more than one candidate is attached.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectionError {
    #[error("No device found.")]
    NoneFound,
    // Picking one by index or serial is not supported
    #[error("Multiple devices found ({count}).")]
    Ambiguous { count: usize },
}

/// Return the only handle, or fail if there are none or several
pub fn select_one<T>(handles: Vec<T>) -> Result<T, SelectionError> {
    let count = handles.len();
    let mut handles = handles.into_iter();
    match (handles.next(), count) {
        (None, _) => Err(SelectionError::NoneFound),
        (Some(handle), 1) => Ok(handle),
        (Some(_), _) => Err(SelectionError::Ambiguous { count }),
    }
}
