//! The textual format describes a sequence of machines. Each machine begins with a line starting
//! with `F`, followed by header lines that state the number of states (`s`), inputs (`i`),
//! outputs (`o`) and transitions (`p`), which are ignored, the start state (`n0`) and one line
//! `from input output to` per transition.
//!
//! ```text
//! F 0
//! s 2
//! i 2
//! o 2
//! n0 S0
//! p 2
//! S0 a 0 S1
//! S1 b 1 S0
//! ```
//!
//! States and alphabets of a machine are the ones that occur in its transitions.
use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::machine::{Machine, MachineError, Transition};

/// Machines as they are read from text, every state and symbol is a string.
pub type TextMachine = Machine<String, String, String>;

/// Errors that can occur while reading machines.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The underlying reader failed.
    #[error("could not read machines: {0}")]
    Io(#[from] std::io::Error),
    /// A transition appeared before the start state of its machine was declared.
    #[error("line {line}: transition of machine {record} appears before its start state")]
    MissingStart {
        /// Line number, starting at 1.
        line: usize,
        /// Index of the machine in the input.
        record: usize,
    },
    /// A start declaration without a state.
    #[error("line {line}: start declaration \"{content}\" names no state")]
    MalformedStart {
        /// Line number, starting at 1.
        line: usize,
        /// The offending line.
        content: String,
    },
    /// A transition line that does not consist of exactly four tokens.
    #[error("line {line}: expected `from input output to`, found \"{content}\"")]
    MalformedTransition {
        /// Line number, starting at 1.
        line: usize,
        /// The offending line.
        content: String,
    },
    /// A machine was read completely but is not well-formed.
    #[error("machine {record} is invalid: {source}")]
    Machine {
        /// Index of the machine in the input.
        record: usize,
        /// The reason for rejecting it.
        source: MachineError,
    },
    /// The input did not describe a single machine.
    #[error("input contains no machine")]
    NoMachines,
}

/// Accumulates the lines belonging to a single machine, a fresh one is used for every record.
#[derive(Debug)]
struct Record {
    index: usize,
    start: Option<String>,
    transitions: Vec<Transition<String, String, String>>,
}

impl Record {
    fn new(index: usize) -> Self {
        Self {
            index,
            start: None,
            transitions: vec![],
        }
    }

    fn finish(self) -> Result<Option<TextMachine>, ParseError> {
        let Some(start) = self.start else {
            // transitions without start are rejected when they are read
            return Ok(None);
        };
        if self.transitions.is_empty() {
            warn!(
                "machine {} with start state {start} has no transitions, skipping it",
                self.index
            );
            return Ok(None);
        }
        let record = self.index;
        let machine = Machine::from_transitions(self.transitions, start)
            .map_err(|source| ParseError::Machine { record, source })?;
        debug!(
            "read machine {record} with {} states and {} transitions",
            machine.size(),
            machine.transitions().len()
        );
        Ok(Some(machine))
    }
}

/// Reads all machines from `read`.
pub fn read_machines<R: BufRead>(read: R) -> Result<Vec<TextMachine>, ParseError> {
    let mut machines = vec![];
    let mut record = Record::new(0);

    for (number, line) in read.lines().enumerate() {
        let line = line?;
        let number = number + 1;
        let tokens = line.split_whitespace().collect::<Vec<_>>();

        match tokens[..] {
            [] => continue,
            [source, input, output, target] => {
                if record.start.is_none() {
                    return Err(ParseError::MissingStart {
                        line: number,
                        record: record.index,
                    });
                }
                record.transitions.push(Transition::new(
                    source.to_string(),
                    input.to_string(),
                    output.to_string(),
                    target.to_string(),
                ));
            }
            [first, ..] if first.starts_with('F') => {
                trace!("line {number}: beginning of machine {}", machines.len());
                let finished = std::mem::replace(&mut record, Record::new(0));
                if let Some(machine) = finished.finish()? {
                    machines.push(machine);
                }
                record.index = machines.len();
            }
            ["n0", start] => record.start = Some(start.to_string()),
            ["n0", ..] => {
                return Err(ParseError::MalformedStart {
                    line: number,
                    content: line.trim().to_string(),
                })
            }
            ["s" | "i" | "o" | "p", ..] => continue,
            _ => {
                return Err(ParseError::MalformedTransition {
                    line: number,
                    content: line.trim().to_string(),
                })
            }
        }
    }

    if let Some(machine) = record.finish()? {
        machines.push(machine);
    }
    if machines.is_empty() {
        return Err(ParseError::NoMachines);
    }
    Ok(machines)
}

/// Reads all machines from the given text.
pub fn parse_machines(text: &str) -> Result<Vec<TextMachine>, ParseError> {
    read_machines(text.as_bytes())
}

/// Reads all machines from the file at `path`.
pub fn read_machines_from_file<P: AsRef<Path>>(path: P) -> Result<Vec<TextMachine>, ParseError> {
    debug!("reading machines from {}", path.as_ref().display());
    read_machines(BufReader::new(File::open(path)?))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::{parse_machines, read_machines_from_file, ParseError};
    use crate::prelude::*;

    const PAIR: &str = "F 0
s 2
i 2
o 2
n0 S0
p 2
S0 a 0 S1
S1 b 1 S0
F 0
s 2
i 2
o 2
n0 S0
p 2
S0 a 0 S1
S1 b 0 S0
";

    #[test]
    fn reads_pair() {
        let machines = parse_machines(PAIR).unwrap();
        assert_eq!(machines.len(), 2);

        let spec = &machines[0];
        assert_eq!(spec.start(), "S0");
        assert_eq!(spec.size(), 2);
        assert_eq!(
            spec.inputs().iter().collect::<Vec<_>>(),
            vec!["a", "b"]
        );
        assert_eq!(
            spec.transitions()[1],
            Transition::new(
                "S1".to_string(),
                "b".to_string(),
                "1".to_string(),
                "S0".to_string()
            )
        );
        assert!(spec.is_deterministic());
        assert_eq!(machines[1].transitions()[1].output, "0");
    }

    #[test]
    fn start_state_does_not_leak_into_next_record() {
        let text = "F 0\nn0 q\nq a x q\nF 1\nq a y q\n";
        assert!(matches!(
            parse_machines(text),
            Err(ParseError::MissingStart { line: 5, record: 1 })
        ));
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(matches!(
            parse_machines("F 0\nn0 q\nq a x\n"),
            Err(ParseError::MalformedTransition { line: 3, .. })
        ));
        assert!(matches!(
            parse_machines("F 0\nn0\nq a x q\n"),
            Err(ParseError::MalformedStart { line: 2, .. })
        ));
        assert!(matches!(
            parse_machines("F 0\ns 1\n"),
            Err(ParseError::NoMachines)
        ));
        assert!(matches!(parse_machines(""), Err(ParseError::NoMachines)));
    }

    #[test]
    fn header_lines_of_any_length_are_ignored() {
        let text = "F 0\ns 2 states\ni\no 1 2 3 4 5\nn0 q\np 1 transition\nq a x q\n";
        let machines = parse_machines(text).unwrap();
        assert_eq!(machines.len(), 1);
        assert_eq!(machines[0].start(), "q");
        assert_eq!(machines[0].transitions().len(), 1);
    }

    #[test]
    fn skips_machines_without_transitions() {
        let machines = parse_machines("F 0\nn0 q\nF 1\nn0 p\np a x p\n").unwrap();
        assert_eq!(machines.len(), 1);
        assert_eq!(machines[0].start(), "p");
    }

    #[test]
    fn reads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(PAIR.as_bytes()).unwrap();
        file.flush().unwrap();

        let machines = read_machines_from_file(file.path()).unwrap();
        assert_eq!(machines.len(), 2);
        assert!(matches!(
            read_machines_from_file(file.path().with_extension("missing")),
            Err(ParseError::Io(_))
        ));
    }
}
