//! Path inference and module naming.

pub mod module_name;
pub mod resolver;

pub use module_name::{
    extract_module_name, generate_qualified_name, get_qualified_module_name,
    parse_qualified_name, ParsedModuleName, TargetKind,
};
pub use resolver::{PathResolver, PathSide, ResolvedPaths};

/// Use `/` separators, drop leading `./` and trailing slashes.
pub fn normalize_path(path: &str) -> String {
    let mut normalized = path.trim().replace('\\', "/");
    while let Some(rest) = normalized.strip_prefix("./") {
        normalized = rest.to_string();
    }
    while normalized.len() > 1 && normalized.ends_with('/') {
        normalized.pop();
    }
    normalized
}
