//! `job.properties` parsing
//!
//! The harness may install a JDK during its own fetch step and record the
//! location in `job.properties` at the repository root.

/// Key the harness writes the installed JDK location under
pub const TEST_JDK_HOME_KEY: &str = "TEST_JDK_HOME=";

/// Returns the last non-empty `TEST_JDK_HOME=<value>` found in `content`
///
/// Accepts LF and CRLF line endings and ignores blank lines. The key may
/// appear anywhere on a line; the value runs to the end of that line.
pub fn test_jdk_home(content: &str) -> Option<String> {
    let normalized = content.replace("\r\n", "\n");
    normalized
        .split('\n')
        .filter(|line| !line.is_empty())
        .filter_map(|line| {
            let start = line.find(TEST_JDK_HOME_KEY)? + TEST_JDK_HOME_KEY.len();
            let value = line[start..].split('\r').next().unwrap_or_default();
            (!value.is_empty()).then(|| value.to_string())
        })
        .last()
}
