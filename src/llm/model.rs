pub const FLASH: &str = "gemini-2.5-flash";
pub const PRO: &str = "gemini-2.5-pro";

/// Maps a configured alias to a model id. Unknown names are passed through
/// so a full model id can be configured directly.
pub fn resolve(name: &str) -> String {
  match name.trim().to_lowercase().as_str() {
    "flash" => FLASH.to_string(),
    "pro" => PRO.to_string(),
    _ => name.trim().to_string(),
  }
}
