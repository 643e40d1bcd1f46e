use std::{env, fs, path::PathBuf};

fn input_args() -> [clap::Arg; 3] {
    [
        clap::arg!(<INPUT> "URL to fetch, local file, or '-' for stdin"),
        clap::arg!(--timeout <SECS> "HTTP timeout in seconds").default_value("30"),
        clap::arg!(--"user-agent" <UA> "Custom User-Agent for HTTP requests"),
    ]
}

fn format_arg() -> clap::Arg {
    clap::arg!(-f --format <FORMAT> "Output format (text, json)")
        .value_name("FORMAT")
        .default_value("text")
        .value_parser(["text", "json"])
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=OUT_DIR");

    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let completions_dir = out_dir.join("completions");

    fs::create_dir_all(&completions_dir).unwrap();

    let mut cmd = clap::Command::new("readcast")
        .about("Summarize articles and find their podcast audio")
        .arg(clap::arg!(-v --verbose "Enable debug logging").global(true))
        .subcommand(
            clap::Command::new("summarize")
                .about("Summarize an article page or plain text")
                .args(input_args())
                .arg(clap::arg!(--plain "Treat the input as plain text"))
                .arg(clap::arg!(-n --sentences <NUM> "Number of sentences").default_value("5"))
                .arg(clap::arg!(--"english-markers" "Use English importance markers"))
                .arg(clap::arg!(--"api-key" <KEY> "Gemini API key"))
                .arg(format_arg())
                .arg(
                    clap::arg!(-o --output <FILE> "Output file (default: stdout)")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                ),
        )
        .subcommand(
            clap::Command::new("media")
                .about("List media URLs found in an article page")
                .args(input_args())
                .arg(format_arg()),
        )
        .subcommand(
            clap::Command::new("articles")
                .about("Browse an article catalog")
                .arg(clap::arg!(--catalog <FILE> "JSON catalog file").value_parser(clap::value_parser!(std::path::PathBuf)))
                .arg(clap::arg!(--id <ID> "Show a single article"))
                .arg(format_arg()),
        )
        .subcommand(
            clap::Command::new("download")
                .about("Download an article's audio for offline listening")
                .arg(clap::arg!(<URL> "Audio URL"))
                .arg(clap::arg!(--id <ID> "Article id the audio belongs to").required(true))
                .arg(
                    clap::arg!(--dir <DIR> "Download directory")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                ),
        );

    clap_complete::generate_to(clap_complete::shells::Bash, &mut cmd, "readcast", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::Zsh, &mut cmd, "readcast", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::Fish, &mut cmd, "readcast", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::PowerShell, &mut cmd, "readcast", &completions_dir).unwrap();
}
