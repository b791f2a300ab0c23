//! Debugger command lines for KStars and the INDI server

use serde::{Deserialize, Serialize};

use crate::launch::LaunchArgs;
use crate::profile::INDI_PORT;

/// A program and its argument list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

impl std::fmt::Display for Invocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " \"{}\"", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

/// INDI server options placed before the driver list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerOptions {
    /// Executable name, normally `indiserver`
    pub program: String,
    /// Listening port (`-p`), only passed when not the default
    pub port: u16,
    /// Driver restart attempts (`-r`)
    pub restart_count: u32,
    /// Verbose logging (`-v`)
    pub verbose: bool,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            program: "indiserver".to_string(),
            port: INDI_PORT,
            restart_count: 0,
            verbose: true,
        }
    }
}

/// `gdb -batch -ex run -ex bt <app>`: run once and print a backtrace on crash
pub fn kstars_invocation(debugger: &str, app: &str) -> Invocation {
    Invocation::new(debugger)
        .args(["-batch", "-ex", "run", "-ex", "bt"])
        .arg(app)
}

/// Run the INDI server under the debugger, following forks into the drivers.
///
/// `gdb -batch -ex "set follow-fork-mode child" -ex run -ex bt --args indiserver [-p port] -r 0 -v <drivers...>`
pub fn indi_invocation(debugger: &str, server: &ServerOptions, drivers: &LaunchArgs) -> Invocation {
    let mut invocation = Invocation::new(debugger)
        .args(["-batch", "-ex", "set follow-fork-mode child", "-ex", "run", "-ex", "bt", "--args"])
        .arg(server.program.as_str());
    if server.port != INDI_PORT {
        invocation = invocation.args(["-p".to_string(), server.port.to_string()]);
    }
    invocation = invocation.args(["-r".to_string(), server.restart_count.to_string()]);
    if server.verbose {
        invocation = invocation.arg("-v");
    }
    invocation.args(drivers.iter())
}
