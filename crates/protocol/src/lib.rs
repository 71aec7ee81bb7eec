pub mod diagnostic;
pub mod shared_str;

pub use diagnostic::{
    Diagnostic, LINE_END_CHARACTER, Location, Position, Range, RelatedInformation, Severity,
    to_editor_line,
};
pub use shared_str::SharedStr;
