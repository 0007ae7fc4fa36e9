pub mod session_key;
pub mod validated_form;

pub use session_key::{SessionKey, SESSION_ID_HEADER};
pub use validated_form::ValidatedForm;
