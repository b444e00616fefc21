// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! The offline event-trace format.
//!
//! A trace is a UTF-8 text file holding one recorded event per line, in the
//! order the instrumented program emitted them:
//!
//! ```text
//! # comment
//! enter NAME
//! call CALLER CALLEE
//! read NAME ADDR
//! write NAME ADDR
//! ```
//!
//! `ADDR` is either hexadecimal with a `0x` prefix or decimal. Blank lines
//! and `#` comments are skipped. Replaying a trace drives an [`EventSink`]
//! exactly the way the live callbacks would.

use anyhow::Context;
use nom::branch::alt;
use nom::bytes::complete::{tag, take_while1};
use nom::character::complete::{digit1, hex_digit1, space1};
use nom::combinator::map_res;
use nom::sequence::{preceded, separated_pair};
use nom::IResult;
use std::io::{self, BufRead};

use super::EventSink;
use crate::util::map_result;

/// One recorded event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    Enter { name: String },
    Call { caller: String, callee: String },
    Read { name: String, addr: u64 },
    Write { name: String, addr: u64 },
}

impl Event {
    /// Feed this event into the sink the way the live callbacks would.
    pub fn apply(&self, sink: &mut EventSink) {
        match self {
            Event::Enter { name } => sink.enter_function(name),
            Event::Call { caller, callee } => sink.call_function(caller, callee),
            Event::Read { name, addr } => sink.memory_read(name, *addr),
            Event::Write { name, addr } => sink.memory_write(name, *addr),
        }
    }
}

fn parse_name(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| !c.is_whitespace())(input)
}

fn parse_addr(input: &str) -> IResult<&str, u64> {
    alt((
        preceded(
            tag("0x"),
            map_res(hex_digit1, |s: &str| u64::from_str_radix(s, 16)),
        ),
        map_res(digit1, |s: &str| s.parse::<u64>()),
    ))(input)
}

fn parse_enter(input: &str) -> IResult<&str, Event> {
    let (input, name) = preceded(tag("enter"), preceded(space1, parse_name))(input)?;
    Ok((input, Event::Enter { name: name.to_owned() }))
}

fn parse_call(input: &str) -> IResult<&str, Event> {
    let (input, (caller, callee)) = preceded(
        tag("call"),
        preceded(space1, separated_pair(parse_name, space1, parse_name)),
    )(input)?;
    Ok((
        input,
        Event::Call {
            caller: caller.to_owned(),
            callee: callee.to_owned(),
        },
    ))
}

fn parse_access(input: &str) -> IResult<&str, Event> {
    let (input, kind) = alt((tag("read"), tag("write")))(input)?;
    let (input, (name, addr)) =
        preceded(space1, separated_pair(parse_name, space1, parse_addr))(input)?;
    let name = name.to_owned();
    let event = if kind == "read" {
        Event::Read { name, addr }
    } else {
        Event::Write { name, addr }
    };
    Ok((input, event))
}

fn parse_event(input: &str) -> IResult<&str, Event> {
    alt((parse_call, parse_access, parse_enter))(input)
}

/// Parse one trace line. Blank lines and comments come back as `None`.
pub fn parse_line(line: &str) -> io::Result<Option<Event>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    map_result(parse_event(line)).map(Some)
}

/// Replay a whole trace into `sink`, returning the number of events fed.
pub fn replay<R: BufRead>(reader: R, sink: &mut EventSink) -> anyhow::Result<u64> {
    let mut fed = 0;
    for (number, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("failed reading trace line {}", number + 1))?;
        if let Some(event) =
            parse_line(&line).with_context(|| format!("bad trace line {}", number + 1))?
        {
            event.apply(sink);
            fed += 1;
        }
    }
    Ok(fed)
}

#[cfg(test)]
mod test {
    use super::{parse_line, Event};

    #[test]
    fn events() {
        assert_eq!(
            parse_line("enter main").unwrap(),
            Some(Event::Enter { name: "main".to_owned() })
        );
        assert_eq!(
            parse_line("call main foo").unwrap(),
            Some(Event::Call { caller: "main".to_owned(), callee: "foo".to_owned() })
        );
        assert_eq!(
            parse_line("read foo 0x1000").unwrap(),
            Some(Event::Read { name: "foo".to_owned(), addr: 0x1000 })
        );
        assert_eq!(
            parse_line("write bar 8192").unwrap(),
            Some(Event::Write { name: "bar".to_owned(), addr: 8192 })
        );
    }

    #[test]
    fn blanks_and_comments() {
        assert_eq!(parse_line("").unwrap(), None);
        assert_eq!(parse_line("   ").unwrap(), None);
        assert_eq!(parse_line("# a comment").unwrap(), None);
    }

    #[test]
    fn surrounding_whitespace() {
        assert_eq!(
            parse_line("  call main foo  ").unwrap(),
            Some(Event::Call { caller: "main".to_owned(), callee: "foo".to_owned() })
        );
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_line("call main").is_err());
        assert!(parse_line("read foo bar").is_err());
        assert!(parse_line("jump foo 0x10").is_err());
        assert!(parse_line("call main foo extra").is_err());
    }
}
