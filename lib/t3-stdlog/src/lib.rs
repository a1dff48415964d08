/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 t3 contributors
 */

use std::io::{self, Write};

use flume::{Receiver, Sender};
use log::{Level, LevelFilter, Log, Metadata, Record};

const DEFAULT_CHANNEL_CAPACITY: usize = 4096;
const IO_THREAD_NAME: &str = "stdlog";

struct StdLogValue {
    level: Level,
    target: String,
    message: String,
}

/// Install the process logger.
///
/// Records are handed to a detached thread over a bounded channel so the
/// emitting task never blocks on terminal output. A full channel drops
/// the record. Verbosity: 0 = info, 1 = debug, 2+ = trace.
pub fn setup(verbose_level: u8) -> anyhow::Result<()> {
    let level = match verbose_level {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    let (sender, receiver) = flume::bounded::<StdLogValue>(DEFAULT_CHANNEL_CAPACITY);

    let io_thread = AsyncIoThread { receiver };
    std::thread::Builder::new()
        .name(IO_THREAD_NAME.to_string())
        .spawn(move || io_thread.run_to_end())?;

    log::set_boxed_logger(Box::new(StdLogger { sender, level }))?;
    log::set_max_level(level);
    Ok(())
}

struct StdLogger {
    sender: Sender<StdLogValue>,
    level: LevelFilter,
}

impl Log for StdLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let value = StdLogValue {
            level: record.level(),
            target: record.target().to_string(),
            message: record.args().to_string(),
        };
        let _ = self.sender.try_send(value);
    }

    fn flush(&self) {}
}

struct AsyncIoThread {
    receiver: Receiver<StdLogValue>,
}

impl AsyncIoThread {
    fn write_time<IO: Write>(&self, io: &mut IO) -> io::Result<()> {
        let datetime = chrono::Local::now();
        write!(io, "{}", datetime.format("%Y-%m-%dT%H:%M:%S%.6f"))
    }

    fn run_to_end(self) {
        if console::user_attended_stderr() {
            self.run_console(io::stderr())
        } else {
            self.run_plain(io::stderr())
        }
    }

    fn run_plain<IO: Write>(&self, mut io: IO) {
        let mut buf: Vec<u8> = Vec::with_capacity(1024);
        while let Ok(v) = self.receiver.recv() {
            buf.clear();
            let _ = self.write_plain(&mut buf, v);
            let _ = io.write_all(&buf);
            let _ = io.flush();
        }
    }

    fn write_plain<IO: Write>(&self, io: &mut IO, v: StdLogValue) -> io::Result<()> {
        self.write_time(io)?;
        writeln!(io, " {} {} {}", v.level, v.target, v.message)
    }

    fn run_console<IO: Write>(&self, mut io: IO) {
        let mut buf: Vec<u8> = Vec::with_capacity(1024);
        while let Ok(v) = self.receiver.recv() {
            buf.clear();
            let _ = self.write_console(&mut buf, v);
            let _ = io.write_all(&buf);
            let _ = io.flush();
        }
    }

    fn write_console<IO: Write>(&self, io: &mut IO, v: StdLogValue) -> io::Result<()> {
        use console::{style, Style};

        self.write_time(io)?;
        let level_color = match v.level {
            Level::Error => Style::new().red(),
            Level::Warn => Style::new().yellow(),
            Level::Info => Style::new().green(),
            Level::Debug => Style::new().cyan(),
            Level::Trace => Style::new().blue(),
        };
        writeln!(
            io,
            " {} {} {}",
            level_color.apply_to(v.level),
            style(v.target).dim(),
            v.message
        )
    }
}
