//! Formatting commands offered by the editor toolbar.
//!
//! Each command is a pair of strings inserted around the current selection.
//! Line-level commands (quote, list items, headings) only carry an opening
//! prefix. `Image` is special: it asks the host to open a file picker.

use std::fmt;
use std::str::FromStr;

/// All toolbar formatting commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatCommand {
    Bold,
    Italic,
    Underline,
    Code,
    Quote,
    UnorderedListItem,
    OrderedListItem,
    Link,
    Image,
    Heading1,
    Heading2,
    Heading3,
}

/// Strings inserted around the selection by a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Wrapper {
    pub before: &'static str,
    pub after: &'static str,
}

impl Wrapper {
    const fn around(before: &'static str, after: &'static str) -> Self {
        Self { before, after }
    }

    const fn prefix(before: &'static str) -> Self {
        Self { before, after: "" }
    }

    /// Whether this wrapper only prefixes (no closing marker).
    pub fn is_prefix(&self) -> bool {
        self.after.is_empty()
    }
}

impl FormatCommand {
    pub const ALL: [FormatCommand; 12] = [
        FormatCommand::Bold,
        FormatCommand::Italic,
        FormatCommand::Underline,
        FormatCommand::Code,
        FormatCommand::Quote,
        FormatCommand::UnorderedListItem,
        FormatCommand::OrderedListItem,
        FormatCommand::Link,
        FormatCommand::Image,
        FormatCommand::Heading1,
        FormatCommand::Heading2,
        FormatCommand::Heading3,
    ];

    /// The insertion wrapper, or `None` for commands that don't insert text
    /// directly.
    pub fn wrapper(self) -> Option<Wrapper> {
        let wrapper = match self {
            FormatCommand::Bold => Wrapper::around("**", "**"),
            FormatCommand::Italic => Wrapper::around("*", "*"),
            FormatCommand::Underline => Wrapper::around("<u>", "</u>"),
            FormatCommand::Code => Wrapper::around("`", "`"),
            FormatCommand::Quote => Wrapper::prefix("> "),
            FormatCommand::UnorderedListItem => Wrapper::prefix("- "),
            FormatCommand::OrderedListItem => Wrapper::prefix("1. "),
            FormatCommand::Link => Wrapper::around("[", "](url)"),
            FormatCommand::Heading1 => Wrapper::prefix("# "),
            FormatCommand::Heading2 => Wrapper::prefix("## "),
            FormatCommand::Heading3 => Wrapper::prefix("### "),
            FormatCommand::Image => return None,
        };
        Some(wrapper)
    }

    /// Short toolbar identifier.
    pub fn name(self) -> &'static str {
        match self {
            FormatCommand::Bold => "bold",
            FormatCommand::Italic => "italic",
            FormatCommand::Underline => "underline",
            FormatCommand::Code => "code",
            FormatCommand::Quote => "quote",
            FormatCommand::UnorderedListItem => "ul",
            FormatCommand::OrderedListItem => "ol",
            FormatCommand::Link => "link",
            FormatCommand::Image => "image",
            FormatCommand::Heading1 => "h1",
            FormatCommand::Heading2 => "h2",
            FormatCommand::Heading3 => "h3",
        }
    }

    /// Human-readable toolbar label.
    pub fn title(self) -> &'static str {
        match self {
            FormatCommand::Bold => "Bold",
            FormatCommand::Italic => "Italic",
            FormatCommand::Underline => "Underline",
            FormatCommand::Code => "Code",
            FormatCommand::Quote => "Quote",
            FormatCommand::UnorderedListItem => "Bullet List",
            FormatCommand::OrderedListItem => "Numbered List",
            FormatCommand::Link => "Link",
            FormatCommand::Image => "Insert Image",
            FormatCommand::Heading1 => "Heading 1",
            FormatCommand::Heading2 => "Heading 2",
            FormatCommand::Heading3 => "Heading 3",
        }
    }

    /// Look up a command by name.
    ///
    /// Accepts the short toolbar identifiers (`ul`, `h1`, ...) as well as the
    /// long forms (`unorderedListItem`, `heading1`, ...). Matching is
    /// case-insensitive. Unknown names yield `None`.
    pub fn from_name(name: &str) -> Option<Self> {
        let command = match name.to_ascii_lowercase().as_str() {
            "bold" => FormatCommand::Bold,
            "italic" => FormatCommand::Italic,
            "underline" => FormatCommand::Underline,
            "code" => FormatCommand::Code,
            "quote" => FormatCommand::Quote,
            "ul" | "unorderedlistitem" => FormatCommand::UnorderedListItem,
            "ol" | "orderedlistitem" => FormatCommand::OrderedListItem,
            "link" => FormatCommand::Link,
            "image" => FormatCommand::Image,
            "h1" | "heading1" => FormatCommand::Heading1,
            "h2" | "heading2" => FormatCommand::Heading2,
            "h3" | "heading3" => FormatCommand::Heading3,
            _ => return None,
        };
        Some(command)
    }
}

impl fmt::Display for FormatCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when parsing an unknown command name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown formatting command: {0}")]
pub struct UnknownCommand(pub String);

impl FromStr for FormatCommand {
    type Err = UnknownCommand;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| UnknownCommand(s.to_string()))
    }
}

/// What happened when a command was dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Text was inserted around the selection.
    Applied,
    /// The host should open its image file picker.
    OpenFilePicker,
    /// Nothing happened: unknown command, unmounted surface, or an image
    /// command while an upload is running.
    Ignored,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrapper_table() {
        let w = FormatCommand::Bold.wrapper().unwrap();
        assert_eq!((w.before, w.after), ("**", "**"));
        let w = FormatCommand::Underline.wrapper().unwrap();
        assert_eq!((w.before, w.after), ("<u>", "</u>"));
        let w = FormatCommand::Link.wrapper().unwrap();
        assert_eq!((w.before, w.after), ("[", "](url)"));
        let w = FormatCommand::Heading3.wrapper().unwrap();
        assert_eq!((w.before, w.after), ("### ", ""));
        assert!(w.is_prefix());
        assert_eq!(FormatCommand::Image.wrapper(), None);
    }

    #[test]
    fn test_line_commands_are_prefixes() {
        for cmd in [
            FormatCommand::Quote,
            FormatCommand::UnorderedListItem,
            FormatCommand::OrderedListItem,
            FormatCommand::Heading1,
            FormatCommand::Heading2,
            FormatCommand::Heading3,
        ] {
            assert!(cmd.wrapper().unwrap().is_prefix(), "{cmd} should be a prefix");
        }
    }

    #[test]
    fn test_name_round_trip() {
        for cmd in FormatCommand::ALL {
            assert_eq!(FormatCommand::from_name(cmd.name()), Some(cmd));
        }
    }

    #[test]
    fn test_long_names_and_unknown() {
        assert_eq!(
            "unorderedListItem".parse::<FormatCommand>(),
            Ok(FormatCommand::UnorderedListItem)
        );
        assert_eq!(
            FormatCommand::from_name("heading2"),
            Some(FormatCommand::Heading2)
        );
        assert_eq!(FormatCommand::from_name("strikethrough"), None);
        assert!("".parse::<FormatCommand>().is_err());
    }
}
