//! Interactive chat REPL.

use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use uniguide_rag::{APOLOGY_PREFIX, Assistant, ConversationTurn};

/// Questions shown when a chat session starts.
pub const EXAMPLE_QUESTIONS: &[&str] = &[
    "What is the eligibility criteria for PhD Mathematics at QAU?",
    "Compare fees of NUST and UET Lahore for BS Computer Science",
    "What entry test is required for COMSATS undergraduate admissions?",
    "What scholarships are available for MS students in Pakistan?",
    "What programs does QAU offer in Social Sciences?",
    "What is the fee structure for BS Electrical Engineering at UET Lahore?",
    "When does NUST take admissions for BS programs?",
    "What is the minimum CGPA required for PhD at COMSATS?",
];

/// What the REPL should do with a line of input.
#[derive(Debug, PartialEq, Eq)]
pub enum Input<'a> {
    Question(&'a str),
    /// `/example N` picks one of [`EXAMPLE_QUESTIONS`].
    Example(usize),
    Clear,
    Help,
    Quit,
    Empty,
}

/// Classify a line typed at the prompt.
pub fn parse_input(line: &str) -> Input<'_> {
    let line = line.trim();
    match line {
        "" => Input::Empty,
        "exit" | "quit" | "/exit" | "/quit" => Input::Quit,
        "/clear" => Input::Clear,
        "/help" | "help" => Input::Help,
        _ => match line.strip_prefix("/example") {
            Some(rest) => match rest.trim().parse::<usize>() {
                Ok(n) if (1..=EXAMPLE_QUESTIONS.len()).contains(&n) => Input::Example(n - 1),
                _ => Input::Help,
            },
            None => Input::Question(line),
        },
    }
}

fn print_banner() {
    println!("Pakistan University Assistant");
    println!("Admissions, fees, programs and scholarships for COMSATS, NUST, UET Lahore and QAU.");
    println!("Always verify details on official university websites before applying.\n");
    print_help();
}

fn print_help() {
    println!("Try one of these (type /example N):");
    for (i, question) in EXAMPLE_QUESTIONS.iter().enumerate() {
        println!("  {}. {question}", i + 1);
    }
    println!("Commands: /clear forgets the conversation, exit quits.\n");
}

/// Append a completed exchange to `history`. Apologies are not recorded.
pub fn record_turn(history: &mut Vec<ConversationTurn>, question: String, answer: String) {
    if answer.starts_with(APOLOGY_PREFIX) {
        return;
    }
    history.push(ConversationTurn::user(question));
    history.push(ConversationTurn::assistant(answer));
}

/// Run the REPL until the user quits or closes stdin.
pub async fn run(assistant: &Assistant) -> anyhow::Result<()> {
    let mut rl = DefaultEditor::new()?;
    let mut history: Vec<ConversationTurn> = Vec::new();
    print_banner();

    loop {
        let line = match rl.readline("you> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };

        let question = match parse_input(&line) {
            Input::Empty => continue,
            Input::Quit => break,
            Input::Help => {
                print_help();
                continue;
            }
            Input::Clear => {
                history.clear();
                println!("Conversation cleared.\n");
                continue;
            }
            Input::Example(i) => {
                println!("you> {}", EXAMPLE_QUESTIONS[i]);
                EXAMPLE_QUESTIONS[i]
            }
            Input::Question(q) => q,
        }
        .to_string();

        let _ = rl.add_history_entry(question.as_str());

        let answer = assistant.answer(&question, &history).await;
        println!("\n{answer}\n");
        record_turn(&mut history, question, answer);
    }

    Ok(())
}
