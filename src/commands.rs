use crate::catalog::{self, SectionId};
use crate::state::Session;
use thiserror::Error;

pub struct CommandDefinition {
    pub name: &'static str,
    pub description: &'static str,
}

/// Registered commands, in the order `compgen` lists them.
pub const COMMAND_DEFINITIONS: &[CommandDefinition] = &[
    CommandDefinition {
        name: "man",
        description: "an interface to the reference manual. Usage: man <command>",
    },
    CommandDefinition {
        name: "compgen",
        description: "list every available command.",
    },
    CommandDefinition {
        name: "ls",
        description: "list the files of this portfolio.",
    },
    CommandDefinition {
        name: "cat",
        description: "display a file of this portfolio. Usage: cat <file>",
    },
    CommandDefinition {
        name: "open",
        description: "open a file of this portfolio. Usage: open <file>",
    },
    CommandDefinition {
        name: "whoami",
        description: "tell you who I am. Same as `cat whoami`.",
    },
    CommandDefinition {
        name: "comment",
        description: "leave a comment on this page. Usage: comment \"your message\"",
    },
];

pub const ERROR_BANNER: &str = "bash: ";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Man(String),
    Compgen,
    Ls,
    Cat(String),
    Open(String),
    Whoami,
    Comment(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Lines(Vec<String>),
    Navigate { hide: SectionId, reveal: SectionId },
    Comment(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("{input}: command not found")]
    NotFound { input: String },
    #[error("{command}: missing operand")]
    MissingOperand { command: &'static str },
    #[error("man: No manual entry for {name}")]
    NoManualEntry { name: String },
    #[error("{command}: {file}: file does not exist")]
    NoSuchFile { command: &'static str, file: String },
    #[error("comment: nothing to post. Usage: comment \"your message\"")]
    EmptyComment,
}

impl CommandError {
    pub fn banner_line(&self) -> String {
        format!("{ERROR_BANNER}{self}")
    }
}

pub fn command_names() -> Vec<&'static str> {
    COMMAND_DEFINITIONS.iter().map(|cmd| cmd.name).collect()
}

fn find_definition(name: &str) -> Option<&'static CommandDefinition> {
    COMMAND_DEFINITIONS.iter().find(|cmd| cmd.name == name)
}

/// Parses a raw prompt line. `Ok(None)` means the line held no tokens.
pub fn parse(raw: &str) -> Result<Option<Command>, CommandError> {
    let tokens: Vec<&str> = raw.split_whitespace().collect();
    let Some((&name, args)) = tokens.split_first() else {
        return Ok(None);
    };
    let not_found = || CommandError::NotFound {
        input: raw.trim().to_string(),
    };

    let command = match name {
        "man" => Command::Man(single_operand("man", args, not_found)?),
        "compgen" => no_operand(args, Command::Compgen).ok_or_else(not_found)?,
        "ls" => no_operand(args, Command::Ls).ok_or_else(not_found)?,
        "cat" => Command::Cat(single_operand("cat", args, not_found)?),
        "open" => Command::Open(single_operand("open", args, not_found)?),
        "whoami" => no_operand(args, Command::Whoami).ok_or_else(not_found)?,
        "comment" => Command::Comment(quoted_argument(raw).ok_or(CommandError::EmptyComment)?),
        _ => return Err(not_found()),
    };
    Ok(Some(command))
}

fn no_operand(args: &[&str], command: Command) -> Option<Command> {
    args.is_empty().then_some(command)
}

fn single_operand(
    command: &'static str,
    args: &[&str],
    too_many: impl FnOnce() -> CommandError,
) -> Result<String, CommandError> {
    match args {
        [] => Err(CommandError::MissingOperand { command }),
        [operand] => Ok((*operand).to_string()),
        _ => Err(too_many()),
    }
}

/// Text between the first pair of double quotes of the untokenized line.
pub fn quoted_argument(raw: &str) -> Option<String> {
    let (_, rest) = raw.split_once('"')?;
    let (inner, _) = rest.split_once('"')?;
    let trimmed = inner.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

impl Command {
    pub fn run(self, session: &mut Session) -> Result<Outcome, CommandError> {
        match self {
            Command::Man(name) => run_man(session, &name),
            Command::Compgen => run_compgen(session),
            Command::Ls => run_ls(session),
            Command::Cat(file) => open_file(session, "cat", &file),
            Command::Open(file) => open_file(session, "open", &file),
            Command::Whoami => open_file(session, "whoami", "whoami"),
            Command::Comment(text) => Ok(Outcome::Comment(text)),
        }
    }
}

fn run_man(_session: &mut Session, name: &str) -> Result<Outcome, CommandError> {
    let definition = find_definition(name).ok_or_else(|| CommandError::NoManualEntry {
        name: name.to_string(),
    })?;
    Ok(Outcome::Lines(vec![format!(
        "{} - {}",
        definition.name, definition.description
    )]))
}

fn run_compgen(_session: &mut Session) -> Result<Outcome, CommandError> {
    Ok(Outcome::Lines(
        command_names().into_iter().map(str::to_string).collect(),
    ))
}

fn run_ls(_session: &mut Session) -> Result<Outcome, CommandError> {
    let listing = catalog::filenames().collect::<Vec<_>>().join("  ");
    Ok(Outcome::Lines(vec![listing]))
}

fn open_file(
    session: &mut Session,
    command: &'static str,
    file: &str,
) -> Result<Outcome, CommandError> {
    let section = catalog::lookup_file(file).ok_or_else(|| CommandError::NoSuchFile {
        command,
        file: file.to_string(),
    })?;
    let hide = session.navigate(section);
    Ok(Outcome::Navigate {
        hide,
        reveal: section,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(raw: &str, session: &mut Session) -> Result<Option<Outcome>, CommandError> {
        match parse(raw)? {
            Some(command) => command.run(session).map(Some),
            None => Ok(None),
        }
    }

    #[test]
    fn blank_lines_parse_to_nothing() {
        assert_eq!(parse(""), Ok(None));
        assert_eq!(parse("   \t "), Ok(None));
    }

    #[test]
    fn tokens_ignore_repeated_whitespace() {
        assert_eq!(
            parse("  cat    education.yaml  "),
            Ok(Some(Command::Cat("education.yaml".to_string())))
        );
    }

    #[test]
    fn unknown_command_echoes_full_input() {
        let err = parse("  sudo rm -rf /  ").unwrap_err();
        assert_eq!(
            err,
            CommandError::NotFound {
                input: "sudo rm -rf /".to_string()
            }
        );
        assert_eq!(err.banner_line(), "bash: sudo rm -rf /: command not found");
    }

    #[test]
    fn commands_are_case_sensitive() {
        assert!(matches!(parse("LS"), Err(CommandError::NotFound { .. })));
    }

    #[test]
    fn too_many_arguments_is_command_not_found() {
        for raw in [
            "ls -la",
            "compgen all",
            "whoami really",
            "man ls cat",
            "cat whoami skills.txt",
            "open a b",
        ] {
            match parse(raw) {
                Err(CommandError::NotFound { input }) => assert_eq!(input, raw),
                other => panic!("unexpected parse result for `{raw}`: {other:?}"),
            }
        }
    }

    #[test]
    fn missing_operand_names_the_command() {
        assert_eq!(
            parse("man"),
            Err(CommandError::MissingOperand { command: "man" })
        );
        assert_eq!(
            parse("cat").unwrap_err().banner_line(),
            "bash: cat: missing operand"
        );
        assert_eq!(
            parse("open"),
            Err(CommandError::MissingOperand { command: "open" })
        );
    }

    #[test]
    fn compgen_lists_each_command_once_in_order() {
        let mut session = Session::new();
        let outcome = run("compgen", &mut session).unwrap();
        assert_eq!(
            outcome,
            Some(Outcome::Lines(
                ["man", "compgen", "ls", "cat", "open", "whoami", "comment"]
                    .iter()
                    .map(|name| name.to_string())
                    .collect()
            ))
        );
    }

    #[test]
    fn ls_lists_catalog_in_order() {
        let mut session = Session::new();
        let Some(Outcome::Lines(lines)) = run("ls", &mut session).unwrap() else {
            panic!("ls should print lines");
        };
        assert_eq!(lines.len(), 1);
        let listed: Vec<_> = lines[0].split_whitespace().collect();
        let expected: Vec<_> = catalog::filenames().collect();
        assert_eq!(listed, expected);
    }

    #[test]
    fn man_describes_known_commands() {
        let mut session = Session::new();
        for name in command_names() {
            let outcome = run(&format!("man {name}"), &mut session).unwrap();
            let Some(Outcome::Lines(lines)) = outcome else {
                panic!("man {name} should print a line");
            };
            assert_eq!(lines.len(), 1);
            assert!(lines[0].starts_with(&format!("{name} - ")), "{}", lines[0]);
        }
    }

    #[test]
    fn man_unknown_names_only_the_token() {
        let mut session = Session::new();
        let err = run("man  frobnicate", &mut session).unwrap_err();
        assert_eq!(
            err,
            CommandError::NoManualEntry {
                name: "frobnicate".to_string()
            }
        );
        let line = err.banner_line();
        assert!(line.ends_with("No manual entry for frobnicate"), "{line}");
        assert!(!line.contains("man  frobnicate"), "{line}");
    }

    #[test]
    fn cat_then_whoami_leaves_whoami_visible() {
        let mut session = Session::new();
        assert_eq!(
            run("cat education.yaml", &mut session).unwrap(),
            Some(Outcome::Navigate {
                hide: SectionId::Whoami,
                reveal: SectionId::Education
            })
        );
        assert_eq!(
            run("cat whoami", &mut session).unwrap(),
            Some(Outcome::Navigate {
                hide: SectionId::Education,
                reveal: SectionId::Whoami
            })
        );
        assert_eq!(session.current_section, SectionId::Whoami);
    }

    #[test]
    fn whoami_matches_cat_whoami() {
        let mut session = Session::new();
        session.navigate(SectionId::Projects);
        assert_eq!(
            run("whoami", &mut session).unwrap(),
            Some(Outcome::Navigate {
                hide: SectionId::Projects,
                reveal: SectionId::Whoami
            })
        );
    }

    #[test]
    fn open_unknown_file_names_the_argument() {
        let mut session = Session::new();
        let err = run("open secrets.txt", &mut session).unwrap_err();
        assert_eq!(
            err.banner_line(),
            "bash: open: secrets.txt: file does not exist"
        );
        assert_eq!(session.current_section, SectionId::Whoami);
    }

    #[test]
    fn comment_takes_first_quoted_run() {
        assert_eq!(
            parse(r#"comment "hello there" and "more""#),
            Ok(Some(Command::Comment("hello there".to_string())))
        );
        assert_eq!(
            parse(r#"comment   "  spaced  "  "#),
            Ok(Some(Command::Comment("spaced".to_string())))
        );
    }

    #[test]
    fn comment_without_quoted_text_is_an_error() {
        for raw in [
            "comment",
            "comment hello",
            r#"comment """#,
            r#"comment "   ""#,
            r#"comment "open"#,
        ] {
            assert_eq!(parse(raw), Err(CommandError::EmptyComment), "{raw}");
        }
    }
}
