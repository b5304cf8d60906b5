#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConsoleCommand {
    List,
    Enter(String),
    Up,
    Forward,
    Select(String),
    Get { name: String, destination: String },
    Pwd,
    Help,
    Quit,
    Utterance(String),
    Empty,
}

pub const HELP: &str = "\
:ls                 list the current directory
:cd <name>          enter a directory from the listing
:up, :back          go to the parent directory
:fwd                go forward again
:sel <name>         select an entry and preview it
:get <name> <dest>  download a file to a local path
:pwd                show where you are
:help               this text
:quit               leave
anything else is sent to the assistant";

pub fn parse_input(line: &str) -> Result<ConsoleCommand, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(ConsoleCommand::Empty);
    }
    let Some(body) = line.strip_prefix(':') else {
        return Ok(ConsoleCommand::Utterance(line.to_string()));
    };
    let (name, rest) = match body.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (body, ""),
    };
    let needs_arg = |cmd: ConsoleCommand| {
        if rest.is_empty() {
            Err(format!(":{name} needs an argument"))
        } else {
            Ok(cmd)
        }
    };
    match name {
        "ls" => Ok(ConsoleCommand::List),
        "cd" => needs_arg(ConsoleCommand::Enter(rest.to_string())),
        "up" | "back" => Ok(ConsoleCommand::Up),
        "fwd" | "forward" => Ok(ConsoleCommand::Forward),
        "sel" => needs_arg(ConsoleCommand::Select(rest.to_string())),
        "get" => match rest.rsplit_once(char::is_whitespace) {
            Some((file, dest)) if !file.trim().is_empty() => Ok(ConsoleCommand::Get {
                name: file.trim().to_string(),
                destination: dest.to_string(),
            }),
            _ => Err(":get needs <name> <dest>".to_string()),
        },
        "pwd" => Ok(ConsoleCommand::Pwd),
        "help" | "h" => Ok(ConsoleCommand::Help),
        "quit" | "q" | "exit" => Ok(ConsoleCommand::Quit),
        other => Err(format!("unknown command :{other}, try :help")),
    }
}
