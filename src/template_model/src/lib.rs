pub mod dates;
pub mod eval;
pub mod explode;
pub mod value;

pub use dates::{BadDate, DateFormatHelpers};
pub use eval::{eval_tmpl_recurse, TemplateError};
pub use explode::{explode_template, handle_date_field, ExplodeContext, ExplodeError};
pub use value::{Binding, ResolvedBinding, Value};
