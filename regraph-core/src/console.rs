use std::env;
use std::io::{self, IsTerminal, Write};
use std::sync::OnceLock;
use std::time::Instant;

static START_TIME: OnceLock<Instant> = OnceLock::new();

fn use_color() -> bool {
    static USE_COLOR: OnceLock<bool> = OnceLock::new();
    *USE_COLOR.get_or_init(|| env::var_os("NO_COLOR").is_none() && io::stdout().is_terminal())
}

fn is_tty() -> bool {
    static IS_TTY: OnceLock<bool> = OnceLock::new();
    *IS_TTY.get_or_init(|| io::stderr().is_terminal())
}

fn paint(code: &str, text: &str) -> String {
    if use_color() {
        format!("\u{1b}[{}m{}\u{1b}[0m", code, text)
    } else {
        text.to_string()
    }
}

pub fn dim(text: &str) -> String {
    paint("2", text)
}

pub fn green(text: &str) -> String {
    paint("32", text)
}

pub fn yellow(text: &str) -> String {
    paint("33", text)
}

pub fn red(text: &str) -> String {
    paint("31", text)
}

pub fn elapsed_secs() -> f32 {
    START_TIME
        .get()
        .map(|t| t.elapsed().as_secs_f32())
        .unwrap_or(0.0)
}

pub fn header(command: &str, version: &str) {
    START_TIME.get_or_init(Instant::now);
    eprintln!("{}", dim(&format!("regraph {} v{}", command, version)));
    eprintln!();
}

pub fn step(message: &str) {
    if is_tty() {
        eprint!("\r\u{1b}[K{}\n", dim(message));
        let _ = io::stderr().flush();
    } else {
        eprintln!("{}", dim(message));
    }
}

pub fn tree_line(prefix: &str, label: &str, note: Option<&str>) {
    match note {
        Some(note) => println!("{}{} {}", dim(prefix), label, dim(note)),
        None => println!("{}{}", dim(prefix), label),
    }
}

pub fn missing_line(prefix: &str, label: &str) {
    println!("{}{} {}", dim(prefix), red(label), dim("(unresolved)"));
}

pub fn written(path: &str) {
    println!("{} {}", green("+"), path);
}

pub fn summary(count: usize, noun_single: &str, noun_plural: &str, seconds: f32) {
    println!();
    let time_str = if seconds < 1.0 {
        format!("{:.0}ms", seconds * 1000.0)
    } else {
        format!("{:.2}s", seconds)
    };
    let noun = if count == 1 { noun_single } else { noun_plural };
    println!("{} {} {}", count, noun, dim(&format!("[{}]", time_str)));
}

pub fn warn(message: &str) {
    let tag = yellow("warn");
    eprintln!("{} {}", tag, message);
}

pub fn info(message: &str) {
    println!("{}", message);
}
