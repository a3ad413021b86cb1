use image::RgbImage;
use std::collections::VecDeque;
use std::io::BufRead;
use std::path::PathBuf;
use tracing::{debug, warn};

use super::session::{Command, Event};
use crate::error::{MaskError, Result};
use crate::geometry::Point;

/// Where capture frames are shown and operator input comes from.
pub trait Surface {
    fn present(&mut self, frame: &RgbImage) -> Result<()>;

    /// Next operator event, or `None` once input is exhausted.
    fn next_event(&mut self) -> Result<Option<Event>>;
}

/// Line-oriented surface: one command per line from any reader (stdin or a
/// script file), frames written as a PNG the operator can keep open.
///
/// Commands: `down X Y`, `move X Y`, `up X Y`, `drag X1 Y1 X2 Y2`,
/// `f`/`face`, `i`/`id`, `r`/`reset`, `s`/`save`, `q`/`quit`.
pub struct LineSurface<R> {
    reader: R,
    preview_path: Option<PathBuf>,
    pending: VecDeque<Event>,
    prompt: bool,
    line: String,
}

impl<R: BufRead> LineSurface<R> {
    pub fn new(reader: R, preview_path: Option<PathBuf>) -> Self {
        Self {
            reader,
            preview_path,
            pending: VecDeque::new(),
            prompt: false,
            line: String::new(),
        }
    }

    /// Prints a `capture> ` prompt before each read.
    pub fn with_prompt(mut self, prompt: bool) -> Self {
        self.prompt = prompt;
        self
    }
}

impl<R: BufRead> Surface for LineSurface<R> {
    fn present(&mut self, frame: &RgbImage) -> Result<()> {
        let Some(path) = self.preview_path.as_ref() else {
            return Ok(());
        };
        frame.save(path).map_err(|source| MaskError::ImageEncode {
            path: path.clone(),
            source,
        })
    }

    fn next_event(&mut self) -> Result<Option<Event>> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Ok(Some(event));
            }
            if self.prompt {
                use std::io::Write;
                print!("capture> ");
                std::io::stdout().flush().ok();
            }
            self.line.clear();
            let read = self
                .reader
                .read_line(&mut self.line)
                .map_err(|err| MaskError::io("<capture input>", err))?;
            if read == 0 {
                debug!("capture input closed");
                return Ok(None);
            }
            match parse_line(&self.line) {
                Ok(events) => self.pending.extend(events),
                Err(message) => warn!("{}", message),
            }
        }
    }
}

pub(crate) fn parse_line(line: &str) -> std::result::Result<Vec<Event>, String> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(Vec::new());
    }
    let mut parts = trimmed.split_whitespace();
    let Some(head) = parts.next() else {
        return Ok(Vec::new());
    };
    let args: Vec<&str> = parts.collect();
    let key = |command: Command| -> std::result::Result<Vec<Event>, String> {
        if args.is_empty() {
            Ok(vec![Event::Command(command)])
        } else {
            Err(format!("'{}' takes no arguments", head))
        }
    };

    match head.to_ascii_lowercase().as_str() {
        "f" | "face" => key(Command::SelectFace),
        "i" | "id" => key(Command::SelectId),
        "r" | "reset" => key(Command::ResetCurrent),
        "s" | "save" => key(Command::Commit),
        "q" | "quit" => key(Command::Abort),
        "down" => Ok(vec![Event::PointerDown(point(&args, head)?)]),
        "move" => Ok(vec![Event::PointerMove(point(&args, head)?)]),
        "up" => Ok(vec![Event::PointerUp(point(&args, head)?)]),
        "drag" => {
            let coords = numbers(&args, 4, head)?;
            let start = Point::new(coords[0], coords[1]);
            let end = Point::new(coords[2], coords[3]);
            Ok(vec![
                Event::PointerDown(start),
                Event::PointerMove(end),
                Event::PointerUp(end),
            ])
        }
        _ => Err(format!("unknown capture command: {}", trimmed)),
    }
}

fn point(args: &[&str], head: &str) -> std::result::Result<Point, String> {
    let coords = numbers(args, 2, head)?;
    Ok(Point::new(coords[0], coords[1]))
}

fn numbers(args: &[&str], count: usize, head: &str) -> std::result::Result<Vec<i32>, String> {
    if args.len() != count {
        return Err(format!("'{}' expects {} numbers", head, count));
    }
    args.iter()
        .map(|value| {
            value
                .parse::<i32>()
                .map_err(|_| format!("'{}': invalid coordinate '{}'", head, value))
        })
        .collect()
}
