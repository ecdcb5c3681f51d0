//! Operator commands read between training cycles.

use std::{
    collections::VecDeque,
    io::{self, BufRead, BufReader},
    str::FromStr,
    sync::mpsc::{channel, Receiver},
    thread,
};

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Command {
    /// Set the current alpha.
    Alpha(f32),
    /// Set the alpha floor.
    Low(f32),
    /// Regenerate the visitation order.
    Order,
    /// Leave the training loop.
    Stop,
}

impl FromStr for Command {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut words = s.split_whitespace();
        let name = words.next().ok_or("empty command")?;

        let mut value = || -> Result<f32, String> {
            let v = words.next().ok_or(format!("'{name}' needs a value"))?;
            v.parse().map_err(|_| format!("bad value '{v}'"))
        };

        let command = match name {
            "alpha" => Self::Alpha(value()?),
            "low" => Self::Low(value()?),
            "order" => Self::Order,
            "stop" => Self::Stop,
            _ => return Err(format!("unknown command '{name}'")),
        };

        Ok(command)
    }
}

/// Source of pending command lines, polled without blocking.
pub trait CommandSource {
    fn next_line(&mut self) -> Option<String>;
}

/// No operator input.
pub struct NoCommands;

impl CommandSource for NoCommands {
    fn next_line(&mut self) -> Option<String> {
        None
    }
}

impl CommandSource for VecDeque<String> {
    fn next_line(&mut self) -> Option<String> {
        self.pop_front()
    }
}

/// Lines typed on stdin, collected by a background reader thread.
pub struct StdinCommands {
    receiver: Receiver<String>,
}

impl StdinCommands {
    pub fn spawn() -> Self {
        Self::from_reader(BufReader::new(io::stdin()))
    }

    /// Read lines from `reader` on a background thread until it ends.
    pub fn from_reader<R: BufRead + Send + 'static>(reader: R) -> Self {
        let (sender, receiver) = channel();

        thread::spawn(move || {
            for line in reader.lines() {
                let Ok(line) = line else { break };

                if sender.send(line).is_err() {
                    break;
                }
            }
        });

        Self { receiver }
    }
}

impl CommandSource for StdinCommands {
    fn next_line(&mut self) -> Option<String> {
        self.receiver.try_recv().ok()
    }
}
