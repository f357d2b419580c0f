//! Small utility helpers used across modules.

/// Very small and safe string templating.
/// Replaces occurrences of `{key}` in the template with provided values.
/// No nesting or conditionals.
pub fn fill_template(tpl: &str, pairs: &[(&str, &str)]) -> String {
  let mut out = tpl.to_string();
  for (k, v) in pairs {
    let needle = format!("{{{}}}", k);
    out = out.replace(&needle, v);
  }
  out
}

/// Log-safe truncation for large strings.
/// Avoids spamming logs with huge request/response payloads.
pub fn trunc_for_log(s: &str, max: usize) -> String {
  if s.len() <= max {
    return s.to_string();
  }
  let mut cut = max;
  while !s.is_char_boundary(cut) {
    cut -= 1;
  }
  format!("{}… ({} bytes total)", &s[..cut], s.len())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn fill_template_replaces_every_occurrence() {
    let out = fill_template("{topic} in {language}; again {topic}", &[("topic", "Badr"), ("language", "Malay")]);
    assert_eq!(out, "Badr in Malay; again Badr");
  }

  #[test]
  fn fill_template_leaves_unknown_keys() {
    assert_eq!(fill_template("{missing}", &[("topic", "x")]), "{missing}");
  }

  #[test]
  fn trunc_for_log_respects_char_boundaries() {
    let s = "هجرة النبي";
    let out = trunc_for_log(s, 3);
    assert!(out.starts_with('ه'));
    assert!(out.ends_with(&format!("({} bytes total)", s.len())));
    assert_eq!(trunc_for_log("short", 10), "short");
  }
}
