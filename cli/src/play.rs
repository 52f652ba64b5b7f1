//! Interactive chain game on stdin.

use std::io::{self, BufRead, Write};

use anyhow::Result;
use guoxue_core::{utils, GameSession, Idiom, JielongResponse, Library};
use tracing::warn;

/// One line of player input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Restart,
    /// Suggestions for the given (possibly empty) prefix.
    Hint(String),
    Quit,
    Word(String),
}

impl Command {
    /// `None` for blank lines.
    pub fn parse(line: &str) -> Option<Self> {
        let line = utils::normalize(line);
        if line.is_empty() {
            return None;
        }
        let cmd = match line.split_once(char::is_whitespace) {
            Some((":hint", rest)) => Command::Hint(rest.trim().to_string()),
            _ => match line.as_str() {
                ":restart" => Command::Restart,
                ":hint" => Command::Hint(String::new()),
                ":quit" | ":q" => Command::Quit,
                _ => Command::Word(line),
            },
        };
        Some(cmd)
    }
}

pub fn print_idiom(label: &str, idiom: &Idiom) {
    println!("  {} {}  [{}]", label, idiom.word, idiom.pinyin);
    println!("     释义: {}", idiom.explanation);
    println!("     出处: {}", idiom.derivation);
    if !idiom.example.is_empty() {
        println!("     例句: {}", idiom.example);
    }
}

fn show_response(resp: &JielongResponse) {
    if !resp.is_valid {
        println!("  ✗ {}", resp.message.as_deref().unwrap_or("无效"));
        return;
    }
    if let Some(user) = &resp.user_idiom {
        print_idiom("你:", user);
    }
    match &resp.ai_idiom {
        Some(ai) => print_idiom("夫子:", ai),
        None => {
            if let Some(msg) = &resp.message {
                println!("  ★ {}", msg);
            }
        }
    }
}

fn show_starters(library: &Library) {
    let starters = library.random_idioms();
    if !starters.is_empty() {
        println!("试试这些开头: {}", starters.join("  "));
    }
}

fn prompt(session: &GameSession) -> io::Result<()> {
    match session.required_lead() {
        Some(lead) => print!("{}… > ", lead),
        None => print!("> "),
    }
    io::stdout().flush()
}

pub fn run(library: &Library) -> Result<()> {
    println!("═══════════════════════════════════════════════════");
    println!("  成语接龙");
    println!("═══════════════════════════════════════════════════");
    println!("输入四字成语; :hint [前缀] 提示, :restart 重来, :quit 退出");
    println!();

    let referee = library.referee();
    let mut session = GameSession::new();
    show_starters(library);
    prompt(&session)?;

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        match Command::parse(&line) {
            None => {}
            Some(Command::Quit) => break,
            Some(Command::Restart) => {
                session.restart();
                println!("已重新开始");
                show_starters(library);
            }
            Some(Command::Hint(prefix)) => {
                let hints = library.suggest(&prefix, session.required_lead());
                if hints.is_empty() {
                    println!("  (没有提示)");
                } else {
                    println!("  {}", hints.join("  "));
                }
            }
            Some(Command::Word(word)) => match session.play(referee, &word) {
                Ok(resp) => {
                    show_response(&resp);
                    if resp.is_valid && resp.ai_idiom.is_none() {
                        session.restart();
                        println!("新的一局开始了");
                        show_starters(library);
                    }
                }
                Err(e) => {
                    warn!(error = %e, "submission failed");
                    eprintln!("⚠ {}", e);
                }
            },
        }
        prompt(&session)?;
    }
    println!();
    Ok(())
}
