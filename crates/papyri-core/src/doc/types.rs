//! Parsed documentation comments

/// Parsed documentation comment
///
/// A `{ ... }` comment is split into a summary (its first paragraph),
/// optional details (the remaining paragraphs) and `@` tags:
///
/// ```text
/// {Moves the actor to a marker.
///
///  Blocks until the move finishes.
///  @param akMarker Where to go
///  @return True on success
///  @example MoveTo(HomeMarker)
///  @see Actor}
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocComment {
    /// Brief summary (first paragraph)
    pub summary: String,
    /// Everything after the first blank line, tags excluded
    pub details: Option<String>,
    /// Parameter documentation in source order
    pub params: Vec<ParamDoc>,
    /// Return value documentation
    pub returns: Option<String>,
    /// Example code, one entry per `@example`
    pub examples: Vec<String>,
    /// Names referenced by `@see`
    pub see_also: Vec<String>,
}

/// Documentation for a function parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamDoc {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Section {
    Summary,
    Details,
    Param,
    Returns,
    Example,
}

impl DocComment {
    /// Parse a doc comment from its text (delimiters already stripped)
    pub fn parse(text: &str) -> Self {
        let mut doc = DocComment::default();
        let mut section = Section::Summary;
        let mut summary_lines: Vec<&str> = Vec::new();
        let mut detail_lines: Vec<&str> = Vec::new();

        for line in text.lines() {
            let trimmed = line.trim();

            if let Some(rest) = trimmed.strip_prefix('@') {
                let (tag, body) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
                let body = body.trim();
                match tag.to_ascii_lowercase().as_str() {
                    "param" => {
                        let (name, description) =
                            body.split_once(char::is_whitespace).unwrap_or((body, ""));
                        doc.params.push(ParamDoc {
                            name: name.to_string(),
                            description: description.trim().to_string(),
                        });
                        section = Section::Param;
                    }
                    "return" | "returns" => {
                        doc.returns = Some(body.to_string());
                        section = Section::Returns;
                    }
                    "example" => {
                        doc.examples.push(body.to_string());
                        section = Section::Example;
                    }
                    "see" => {
                        doc.see_also.extend(
                            body.split(',')
                                .map(str::trim)
                                .filter(|s| !s.is_empty())
                                .map(String::from),
                        );
                        section = Section::Details;
                    }
                    // Unknown tags read as prose
                    _ => detail_lines.push(trimmed),
                }
                continue;
            }

            match section {
                Section::Summary => {
                    if trimmed.is_empty() && !summary_lines.is_empty() {
                        section = Section::Details;
                    } else if !trimmed.is_empty() {
                        summary_lines.push(trimmed);
                    }
                }
                Section::Details => detail_lines.push(trimmed),
                Section::Param => {
                    if let Some(param) = doc.params.last_mut() {
                        append_line(&mut param.description, trimmed);
                    }
                }
                Section::Returns => {
                    if let Some(returns) = doc.returns.as_mut() {
                        append_line(returns, trimmed);
                    }
                }
                Section::Example => {
                    // Examples keep their line structure
                    if let Some(example) = doc.examples.last_mut() {
                        if !example.is_empty() {
                            example.push('\n');
                        }
                        example.push_str(line.trim_end());
                    }
                }
            }
        }

        doc.summary = summary_lines.join(" ");
        let details = detail_lines.join("\n").trim().to_string();
        if !details.is_empty() {
            doc.details = Some(details);
        }
        for example in &mut doc.examples {
            *example = example.trim_end().to_string();
        }
        doc
    }

    /// Check if the doc comment is empty
    pub fn is_empty(&self) -> bool {
        self.summary.is_empty()
            && self.details.is_none()
            && self.params.is_empty()
            && self.returns.is_none()
            && self.examples.is_empty()
            && self.see_also.is_empty()
    }

    /// Summary and details as one text block
    pub fn text(&self) -> String {
        match &self.details {
            Some(details) if self.summary.is_empty() => details.clone(),
            Some(details) => format!("{}\n\n{}", self.summary, details),
            None => self.summary.clone(),
        }
    }

    /// Documentation for a parameter, matched case-insensitively
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
            .map(|p| p.description.as_str())
    }
}

fn append_line(target: &mut String, line: &str) {
    if line.is_empty() {
        return;
    }
    if !target.is_empty() {
        target.push(' ');
    }
    target.push_str(line);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_summary_only() {
        let doc = DocComment::parse("Represents my custom quest");
        assert_eq!(doc.summary, "Represents my custom quest");
        assert_eq!(doc.details, None);
        assert_eq!(doc.text(), "Represents my custom quest");
    }

    #[test]
    fn parse_multiline_summary_and_details() {
        let doc = DocComment::parse("Moves the actor\n  to a marker.\n\nBlocks until done.\nReally.");
        assert_eq!(doc.summary, "Moves the actor to a marker.");
        assert_eq!(doc.details.as_deref(), Some("Blocks until done.\nReally."));
    }

    #[test]
    fn parse_tags() {
        let text = "Does a thing.\n\
                    @param a The first\n  continued\n\
                    @param B second\n\
                    @returns True when done\n\
                    @see Actor, Quest\n\
                    @example DoThing(1)\nDoThing(2, false)";
        let doc = DocComment::parse(text);
        assert_eq!(doc.summary, "Does a thing.");
        assert_eq!(doc.param("A"), Some("The first continued"));
        assert_eq!(doc.param("b"), Some("second"));
        assert_eq!(doc.returns.as_deref(), Some("True when done"));
        assert_eq!(doc.see_also, vec!["Actor", "Quest"]);
        assert_eq!(doc.examples, vec!["DoThing(1)\nDoThing(2, false)"]);
    }

    #[test]
    fn empty_comment() {
        assert!(DocComment::parse("   ").is_empty());
    }
}
