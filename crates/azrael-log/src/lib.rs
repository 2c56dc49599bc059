// Re-export logging functions for convenience.
pub use log::*;
use log4rs::{
    append::{console::ConsoleAppender, file::FileAppender},
    config::{Appender, Root},
    encode::pattern::PatternEncoder,
    Config,
};

/// Default log file of the server process.
pub const LOG_FILE: &str = "./azrael.log";

/// Initializes logging. Should be called before any other logging functions.
/// Messages below `filter` are discarded. Output goes to the console and to
/// `LOG_FILE`.
pub fn init(filter: LevelFilter) {
    init_with_file(filter, LOG_FILE)
}

/// Like `init`, but with an explicit log file path.
pub fn init_with_file(filter: LevelFilter, path: &str) {
    let stdout = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new("{h({l})} - {t} - {m}{n}")))
        .build();

    let log_file = FileAppender::builder()
        .encoder(Box::new(PatternEncoder::new("{d} - {l} - {t} - {m}{n}")))
        .build(path)
        .expect("unable to initialize logging to file");

    let config = Config::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout)))
        .appender(Appender::builder().build("log_file", Box::new(log_file)))
        .build(
            Root::builder()
                .appender("log_file")
                .appender("stdout")
                .build(filter),
        )
        .expect("unable to create logging configuration");

    log4rs::init_config(config).expect("unable to initialize logging");

    log_panics::init();
}
