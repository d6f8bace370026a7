use crate::error::Error;

/// Placeholders recognized in `filename_template`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
    /// Resolved date, `YYYY-MM-DD`.
    Date,
    /// File stem with any leading date prefix removed.
    Name,
    /// Sanitized name of the immediate parent folder.
    Folder,
}

impl Placeholder {
    fn from_key(key: &str) -> Option<Self> {
        match key {
            "date" => Some(Placeholder::Date),
            "name" => Some(Placeholder::Name),
            "folder" => Some(Placeholder::Folder),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Field(Placeholder),
}

/// Values a template is rendered against.
#[derive(Debug, Clone, Copy)]
pub struct NameContext<'a> {
    pub date: &'a str,
    pub name: &'a str,
    pub folder: &'a str,
}

/// A filename template parsed once at startup. Rendering cannot fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamingTemplate {
    segments: Vec<Segment>,
}

impl NamingTemplate {
    /// Pattern used when no template is configured, and for files that are
    /// already inside the target root.
    pub const FALLBACK: &'static str = "{date}_{name}";

    pub fn parse(template: &str) -> Result<Self, Error> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = template.chars();

        while let Some(c) = chars.next() {
            match c {
                '{' => {
                    let mut key = String::new();
                    let mut closed = false;
                    for k in chars.by_ref() {
                        if k == '}' {
                            closed = true;
                            break;
                        }
                        key.push(k);
                    }
                    if !closed {
                        return Err(Error::Template(format!(
                            "unclosed '{{' in '{}'",
                            template
                        )));
                    }
                    let field = Placeholder::from_key(key.trim()).ok_or_else(|| {
                        Error::Template(format!(
                            "unknown placeholder '{{{}}}' in '{}' (expected {{date}}, {{name}} or {{folder}})",
                            key, template
                        ))
                    })?;
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Field(field));
                }
                '}' => {
                    return Err(Error::Template(format!(
                        "unmatched '}}' in '{}'",
                        template
                    )));
                }
                _ => literal.push(c),
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        if !segments
            .iter()
            .any(|s| *s == Segment::Field(Placeholder::Name))
        {
            return Err(Error::Template(format!(
                "'{}' must contain {{name}}",
                template
            )));
        }

        Ok(Self { segments })
    }

    pub fn fallback() -> Self {
        Self {
            segments: vec![
                Segment::Field(Placeholder::Date),
                Segment::Literal("_".to_string()),
                Segment::Field(Placeholder::Name),
            ],
        }
    }

    pub fn render(&self, ctx: &NameContext<'_>) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(s) => out.push_str(s),
                Segment::Field(Placeholder::Date) => out.push_str(ctx.date),
                Segment::Field(Placeholder::Name) => out.push_str(ctx.name),
                Segment::Field(Placeholder::Folder) => out.push_str(ctx.folder),
            }
        }
        out
    }
}

impl Default for NamingTemplate {
    fn default() -> Self {
        Self::fallback()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> NameContext<'static> {
        NameContext {
            date: "2024-01-01",
            name: "Photo",
            folder: "SourceFolder",
        }
    }

    #[test]
    fn test_render_provenance_template() {
        let t = NamingTemplate::parse("{date}_{name}_from_{folder}").unwrap();
        assert_eq!(t.render(&ctx()), "2024-01-01_Photo_from_SourceFolder");
    }

    #[test]
    fn test_fallback_matches_parsed_fallback() {
        let parsed = NamingTemplate::parse(NamingTemplate::FALLBACK).unwrap();
        assert_eq!(parsed, NamingTemplate::fallback());
        assert_eq!(parsed.render(&ctx()), "2024-01-01_Photo");
    }

    #[test]
    fn test_unknown_placeholder_rejected() {
        let err = NamingTemplate::parse("{date}_{name}_{camera}").unwrap_err();
        assert!(matches!(err, Error::Template(_)));
    }

    #[test]
    fn test_unbalanced_braces_rejected() {
        assert!(NamingTemplate::parse("{date_{name}").is_err());
        assert!(NamingTemplate::parse("{name}}").is_err());
        assert!(NamingTemplate::parse("{name").is_err());
    }

    #[test]
    fn test_template_without_name_rejected() {
        assert!(NamingTemplate::parse("{date}_{folder}").is_err());
    }
}
