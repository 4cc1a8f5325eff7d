// src/signature.rs
//! Deterministic signature hashing used as the operation dispatch key.
//!
//! The key is the 31-polynomial string hash over the UTF-16 code units of
//! `declaring type ++ name ++ parameter types...`, wrapping at 32 bits. It is
//! stable across processes and identical to the key other management
//! implementations compute for the same signature.

/// Declaring type of the naming operations.
pub const CONTEXT_INTERFACE: &str = "javax.naming.Context";

pub const STRING_TYPE: &str = "java.lang.String";
pub const OBJECT_TYPE: &str = "java.lang.Object";
pub const MAP_TYPE: &str = "java.util.Map";
pub const VOID_TYPE: &str = "void";

/// Polynomial string hash over UTF-16 code units.
pub fn string_hash(s: &str) -> i32 {
    s.encode_utf16()
        .fold(0i32, |h, unit| h.wrapping_mul(31).wrapping_add(i32::from(unit)))
}

fn hash_parts<'a>(parts: impl IntoIterator<Item = &'a str>) -> i32 {
    let mut joined = String::new();
    for p in parts {
        joined.push_str(p);
    }
    string_hash(&joined)
}

/// Dispatch key for an operation declared on `declaring`.
pub fn hash_operation<S: AsRef<str>>(declaring: &str, name: &str, params: &[S]) -> i32 {
    hash_parts(
        [declaring, name]
            .into_iter()
            .chain(params.iter().map(|p| p.as_ref())),
    )
}

/// Dispatch key for a constructor of `class_name`. Constructors have no name part.
pub fn hash_constructor<S: AsRef<str>>(class_name: &str, params: &[S]) -> i32 {
    hash_operation(class_name, "", params)
}
