//! CLI entry point. Argument parsing mirrors the original `Args` class: a
//! hand-rolled loop, because `-f`/`-q` greedily consume every following
//! non-flag token up to the next recognized flag, a shape that doesn't map
//! onto a derive-based arg parser's arg-group model.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use geoloc::errors::{fatal, log_context};
use geoloc::etl::etl;
use geoloc::query::{header_line, parse_ip, render_line, GeoData};

const FLAGS: &[&str] = &["-f", "--import", "--headers", "-q", "-o"];

fn is_flag(tok: &str) -> bool {
    FLAGS.contains(&tok)
}

#[derive(Default)]
struct Args {
    import_dir: Option<String>,
    output: Option<String>,
    data_files: Vec<String>,
    queries: Vec<String>,
    headers: bool,
}

fn usage() -> &'static str {
    "usage:\n  \
     geoloc --import <dir> -o <file>\n  \
     geoloc -f <csv_file> [<csv_file> ...] [--headers]\n  \
     geoloc -q <ip> [<ip> ...] [--headers]"
}

/// Consume every following non-flag token for a greedy multi-value flag
/// like `-f`/`-q`. At least one value is required; an empty grab is a
/// fatal usage error, matching `geoloc.cpp`'s `usage("empty query arg")` /
/// `usage("empty file arg")`.
fn take_values(flag: &str, tokens: &[String], i: &mut usize) -> Result<Vec<String>> {
    let mut values = Vec::new();
    *i += 1;
    while *i < tokens.len() && !is_flag(&tokens[*i]) {
        values.push(tokens[*i].clone());
        *i += 1;
    }

    if values.is_empty() {
        bail!("{flag} requires at least one argument\n{}", usage());
    }

    Ok(values)
}

fn parse_args(tokens: &[String]) -> Result<Args> {
    let mut args = Args::default();
    let mut i = 0;

    while i < tokens.len() {
        let tok = tokens[i].as_str();
        match tok {
            "--import" => {
                i += 1;
                let value = tokens.get(i).context("--import requires a directory argument")?;
                args.import_dir = Some(value.clone());
                i += 1;
            }
            "-o" => {
                i += 1;
                let value = tokens.get(i).context("-o requires a file argument")?;
                args.output = Some(value.clone());
                i += 1;
            }
            "-f" => {
                args.data_files = take_values("-f", tokens, &mut i)?;
            }
            "-q" => {
                args.queries = take_values("-q", tokens, &mut i)?;
            }
            "--headers" => {
                args.headers = true;
                i += 1;
            }
            other => bail!("unrecognized option {other:?}\n{}", usage()),
        }
    }

    if args.import_dir.is_some() && (!args.data_files.is_empty() || !args.queries.is_empty()) {
        bail!("--import is mutually exclusive with -f/-q\n{}", usage());
    }

    if args.import_dir.is_some() && args.output.is_none() {
        bail!("--import requires -o <file>\n{}", usage());
    }

    Ok(args)
}

fn default_data_path() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME is not set; cannot locate default data file")?;
    Ok(Path::new(&home).join("var/db/geoloc/geodata.bin"))
}

fn run_query(data_files: &[String], queries: &[String], headers: bool) -> Result<()> {
    let path = match data_files.first() {
        Some(f) => PathBuf::from(f),
        None => default_data_path()?,
    };

    log_context(format!("opening geodata file {}", path.display()));
    let opened = GeoData::open(&path)?;
    let data = opened.borrow()?;

    if headers {
        println!("{}", header_line());
    }

    for query in queries {
        let Some(quad) = parse_ip(query) else {
            continue;
        };

        let result = data.query(quad);
        println!("{}", render_line(&result));
    }

    Ok(())
}

fn run() -> Result<()> {
    let tokens: Vec<String> = std::env::args().skip(1).collect();
    let args = parse_args(&tokens)?;

    if let Some(import_dir) = &args.import_dir {
        let output = args.output.as_ref().expect("validated above");
        log_context(format!("importing {import_dir} into {output}"));
        etl(Path::new(import_dir), Path::new(output))?;
        return Ok(());
    }

    run_query(&args.data_files, &args.queries, args.headers)
}

fn main() {
    if let Err(err) = run() {
        fatal(&err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn bare_dash_q_with_no_following_ip_is_an_error() {
        assert!(parse_args(&toks(&["-q"])).is_err());
    }

    #[test]
    fn bare_dash_f_with_no_following_file_is_an_error() {
        assert!(parse_args(&toks(&["-f"])).is_err());
    }

    #[test]
    fn dash_q_stops_at_the_next_recognized_flag() {
        let args = parse_args(&toks(&["-q", "1.2.3.4", "--headers"])).unwrap();
        assert_eq!(args.queries, vec!["1.2.3.4"]);
        assert!(args.headers);
    }

    #[test]
    fn import_requires_output_path() {
        assert!(parse_args(&toks(&["--import", "dir"])).is_err());
    }

    #[test]
    fn import_and_query_are_mutually_exclusive() {
        assert!(parse_args(&toks(&["--import", "dir", "-o", "out.bin", "-q", "1.2.3.4"])).is_err());
    }
}
