pub mod task_parser;
pub mod task_serializer;

pub use task_parser::{is_task, parse_line};
pub use task_serializer::{MOVED_PREFIX, moved_display_rest, serialize_line};
