//! Interactive shell and script runner over a [`Dispatcher`].
//!
//! By default we use `rustyline` for line editing and tab completion.
//! A minimal stdin-based fallback exists behind `--no-default-features`.

use crate::demo::Demo;
use anyhow::{anyhow, Result};
use cmdchain_core::{CommandError, CommandSender, Dispatcher, Token};
use colored::Colorize;
use std::fs;
use std::io;
use std::io::Read;
#[cfg(not(feature = "repl-rustyline"))]
use std::io::Write;
use std::path::PathBuf;

const PROMPT: &str = "cmdchain> ";
#[cfg(feature = "repl-rustyline")]
const BUILTINS: [&str; 3] = ["help", "exit", "quit"];

pub fn cmd_repl(demo: &Demo, sender: &dyn CommandSender) -> Result<()> {
    #[cfg(feature = "repl-rustyline")]
    {
        cmd_repl_rustyline(demo, sender)
    }
    #[cfg(not(feature = "repl-rustyline"))]
    {
        cmd_repl_simple(&demo.dispatcher, sender)
    }
}

pub fn cmd_repl_script(
    dispatcher: &Dispatcher,
    sender: &dyn CommandSender,
    script: Option<&PathBuf>,
    commands: &[String],
    continue_on_error: bool,
    quiet: bool,
) -> Result<()> {
    let mut lines: Vec<String> = Vec::new();

    if let Some(script_path) = script {
        let text = if script_path.as_os_str() == "-" {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            buf
        } else {
            fs::read_to_string(script_path)
                .map_err(|e| anyhow!("failed to read script {}: {e}", script_path.display()))?
        };
        lines.extend(text.lines().map(str::to_string));
    }
    lines.extend(commands.iter().cloned());

    for (idx, raw_line) in lines.iter().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with("//") {
            continue;
        }

        if !quiet {
            println!("{PROMPT}{line}");
        }

        match dispatch_line(dispatcher, sender, line) {
            Ok(ReplControl::Continue) => {}
            Ok(ReplControl::Exit) => break,
            Err(e) => {
                let rendered = dispatcher.render_error(&e);
                if continue_on_error {
                    eprintln!("{} {rendered}", "error:".red().bold());
                } else {
                    return Err(anyhow!("script failed at line {}: {rendered}", idx + 1));
                }
            }
        }
    }

    Ok(())
}

#[cfg(not(feature = "repl-rustyline"))]
fn cmd_repl_simple(dispatcher: &Dispatcher, sender: &dyn CommandSender) -> Result<()> {
    println!("{}", "cmdchain REPL".green().bold());
    println!("Type `help` for commands. Type `exit` to quit.\n");

    let stdin = io::stdin();
    loop {
        print!("{}", PROMPT.cyan().bold());
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            break;
        }

        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match dispatch_line(dispatcher, sender, line) {
            Ok(ReplControl::Continue) => {}
            Ok(ReplControl::Exit) => break,
            Err(e) => eprintln!("{} {}", "error:".red().bold(), dispatcher.render_error(&e)),
        }
    }

    Ok(())
}

#[cfg(feature = "repl-rustyline")]
fn cmd_repl_rustyline(demo: &Demo, sender: &dyn CommandSender) -> Result<()> {
    use rustyline::error::ReadlineError;
    use rustyline::Editor;

    let dispatcher = &demo.dispatcher;
    println!("{}", "cmdchain REPL".green().bold());
    println!("Tab-completion enabled. Type `help` for commands. Type `exit` to quit.\n");

    let helper = ReplLineHelper::new(demo);
    let mut rl: Editor<ReplLineHelper, rustyline::history::DefaultHistory> =
        Editor::new().map_err(|e| anyhow!("failed to init rustyline: {e}"))?;
    rl.set_helper(Some(helper));

    loop {
        let line = match rl.readline(PROMPT) {
            Ok(l) => l,
            Err(ReadlineError::Eof) => break,
            Err(ReadlineError::Interrupted) => continue,
            Err(e) => return Err(anyhow!("readline error: {e}")),
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        rl.add_history_entry(line)
            .map_err(|e| anyhow!("failed to record history: {e}"))?;

        match dispatch_line(dispatcher, sender, line) {
            Ok(ReplControl::Continue) => {}
            Ok(ReplControl::Exit) => break,
            Err(e) => eprintln!("{} {}", "error:".red().bold(), dispatcher.render_error(&e)),
        }
    }

    Ok(())
}

#[derive(Debug, PartialEq, Eq)]
enum ReplControl {
    Continue,
    Exit,
}

/// Shell built-ins first, then the command tree.
fn dispatch_line(dispatcher: &Dispatcher, sender: &dyn CommandSender, line: &str) -> Result<ReplControl, CommandError> {
    let tokens = dispatcher.config().lexer.tokenize(line);
    let Some(Token::Word(first)) = tokens.first() else {
        dispatcher.dispatch(sender, line)?;
        return Ok(ReplControl::Continue);
    };

    match first.to_lowercase().as_str() {
        "exit" | "quit" => Ok(ReplControl::Exit),
        "help" => {
            let entries = match tokens.get(1) {
                Some(topic) => dispatcher.root().help_for(sender, "", &topic.text())?,
                None => dispatcher.help(sender)?,
            };
            sender.send_message(&dispatcher.render_help(&entries));
            Ok(ReplControl::Continue)
        }
        _ => {
            dispatcher.dispatch(sender, line)?;
            Ok(ReplControl::Continue)
        }
    }
}

#[cfg(feature = "repl-rustyline")]
struct ReplLineHelper {
    commands: Vec<String>,
    search_words: Vec<String>,
}

#[cfg(feature = "repl-rustyline")]
impl ReplLineHelper {
    fn new(demo: &Demo) -> Self {
        let mut commands = demo.dispatcher.root().labels();
        commands.extend(BUILTINS.iter().map(|b| b.to_string()));
        commands.sort();

        let mut search_words: Vec<String> = demo
            .handlers
            .handler_names()
            .into_iter()
            .map(|name| format!("{name}:"))
            .collect();
        search_words.extend(demo.handlers.command_names());
        search_words.sort();

        Self { commands, search_words }
    }

    fn pairs_from_prefix(items: &[String], prefix: &str) -> Vec<rustyline::completion::Pair> {
        let prefix = prefix.trim_start_matches('!').to_lowercase();
        items
            .iter()
            .filter(|item| item.starts_with(&prefix))
            .map(|item| rustyline::completion::Pair {
                display: item.clone(),
                replacement: item.clone(),
            })
            .collect()
    }
}

#[cfg(feature = "repl-rustyline")]
impl rustyline::Helper for ReplLineHelper {}

#[cfg(feature = "repl-rustyline")]
impl rustyline::highlight::Highlighter for ReplLineHelper {}

#[cfg(feature = "repl-rustyline")]
impl rustyline::hint::Hinter for ReplLineHelper {
    type Hint = String;
    fn hint(&self, _line: &str, _pos: usize, _ctx: &rustyline::Context<'_>) -> Option<String> {
        None
    }
}

#[cfg(feature = "repl-rustyline")]
impl rustyline::validate::Validator for ReplLineHelper {}

#[cfg(feature = "repl-rustyline")]
impl rustyline::completion::Completer for ReplLineHelper {
    type Candidate = rustyline::completion::Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Self::Candidate>)> {
        let start = line[..pos]
            .rfind(|c: char| c.is_whitespace())
            .map(|i| i + 1)
            .unwrap_or(0);
        let word = &line[start..pos];
        let tokens: Vec<&str> = line[..start].split_whitespace().collect();

        let Some(cmd) = tokens.first() else {
            return Ok((start, Self::pairs_from_prefix(&self.commands, word)));
        };

        // Keep a leading `!` in place; only the handler name is replaced.
        let start = if word.starts_with('!') { start + 1 } else { start };
        match (cmd.to_lowercase().as_str(), tokens.len()) {
            ("find", 1) => Ok((start, Self::pairs_from_prefix(&["users".to_string()], word))),
            ("find", _) | ("sql", _) => Ok((start, Self::pairs_from_prefix(&self.search_words, word))),
            _ => Ok((start, Vec::new())),
        }
    }
}
