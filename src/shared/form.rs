use std::collections::HashMap;

/// Submitted form fields.
///
/// Every field name maps to all of its values in submission order, so a
/// checkbox group that sent zero, one or many values is always read back as
/// a sequence. Array-style names (`existingImages[]`) are folded onto the
/// bare name.
#[derive(Debug, Clone, Default)]
pub struct FormValues {
    values: HashMap<String, Vec<String>>,
}

impl FormValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let name = name.strip_suffix("[]").map(str::to_string).unwrap_or(name);
        self.values.entry(name).or_default().push(value.into());
    }

    /// First value of a field, untouched
    pub fn first(&self, name: &str) -> Option<&str> {
        self.values
            .get(name)
            .and_then(|v| v.first())
            .map(String::as_str)
    }

    /// First value of a field, trimmed, `None` when blank
    pub fn text(&self, name: &str) -> Option<String> {
        self.first(name)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }

    /// Every value submitted under `name`
    pub fn all(&self, name: &str) -> Vec<String> {
        self.values.get(name).cloned().unwrap_or_default()
    }
}

impl<K, V> FromIterator<(K, V)> for FormValues
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut form = FormValues::new();
        for (name, value) in iter {
            form.push(name, value);
        }
        form
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeated_field_keeps_order() {
        let form: FormValues = [
            ("existingImages", "/uploads/images/a.png"),
            ("existingImages[]", "/uploads/images/b.png"),
        ]
        .into_iter()
        .collect();

        assert_eq!(
            form.all("existingImages"),
            vec![
                "/uploads/images/a.png".to_string(),
                "/uploads/images/b.png".to_string()
            ]
        );
    }

    #[test]
    fn test_missing_field_is_empty_sequence() {
        let form = FormValues::new();
        assert!(form.all("existingImages").is_empty());
        assert!(form.first("name").is_none());
    }

    #[test]
    fn test_text_trims_and_drops_blank() {
        let form: FormValues = [("title", "  Hero  "), ("content", "   ")]
            .into_iter()
            .collect();
        assert_eq!(form.text("title").as_deref(), Some("Hero"));
        assert!(form.text("content").is_none());
    }
}
