//! Stable resource names and name expressions.

/// Builds the stable output name of a downloaded resource.
///
/// The digest ties the name to the canonicalized source so two distinct
/// resources sharing a basename never collide, while every reference to
/// one resource lands on one name.
pub fn resource_name(stem: &str, ext: &str, key: &str) -> String {
    let digest = format!("{:x}", md5::compute(key));
    format!("{stem}_{}{ext}", &digest[..6])
}

/// Evaluates a name expression against a source's stem and extension.
///
/// `$name` expands to the stem, `$ext` to the extension (with dot) and
/// `$uuid` to a fresh v4 UUID.
pub fn evaluate_name_expression(expression: &str, stem: &str, ext: &str) -> String {
    let mut name = expression.to_string();
    if name.contains("$uuid") {
        name = name.replace("$uuid", &uuid::Uuid::new_v4().to_string());
    }
    name.replace("$name", stem).replace("$ext", ext)
}
