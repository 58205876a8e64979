use crate::CLAP_STYLING;
use clap::{arg, command};
use sitewalk::handlers::parse_start_url;

pub(crate) fn command_argument_builder() -> clap::Command {
    clap::Command::new("sitewalk")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("sitewalk")
        .about("Concurrent same-host crawler over link graphs")
        .styles(CLAP_STYLING)
        .arg(
            arg!(-q --"quiet" "Suppress banner, progress and log output")
                .required(false)
                .global(true)
                .conflicts_with("verbose"),
        )
        .arg(
            arg!(-v --"verbose" "Increase log verbosity (-v info, -vv debug, -vvv trace)")
                .required(false)
                .global(true)
                .action(clap::ArgAction::Count),
        )
        .subcommand_required(false)
        .subcommand(
            command!("crawl")
                .about(
                    "Crawl a host or collection of hosts over a link graph, staying on the \
                start URL's host.",
                )
                .arg(
                    arg!(-g --"graph" <PATH>)
                        .required(true)
                        .help("JSON link graph (adjacency map or {urls, edges})"),
                )
                .arg(
                    arg!(-u --"url" <URL>)
                        .required(false)
                        .help("The URL to start from")
                        .value_parser(parse_start_url)
                        .conflicts_with("hosts-file"),
                )
                .arg(
                    arg!(-H --"hosts-file" <PATH>)
                        .required(false)
                        .help("Path to a newline-delimited file of start URLs")
                        .value_parser(clap::value_parser!(std::path::PathBuf))
                        .conflicts_with("url"),
                )
                .arg(
                    arg!(-t --"threads" <NUM_WORKERS>)
                        .required(false)
                        .help("The number of worker threads in the pool.")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("10"),
                )
                .arg(
                    arg!(--"strategy" <STRATEGY>)
                        .required(false)
                        .help("Termination strategy: counted (shared queue) or wavefront (level by level)")
                        .value_parser(["counted", "wavefront"])
                        .default_value("counted"),
                )
                .arg(
                    arg!(--"timeout" <SECONDS>)
                        .required(false)
                        .help("Abort a host's crawl after this many seconds")
                        .value_parser(clap::value_parser!(u64)),
                )
                .arg(
                    arg!(-o --"output" <PATH>)
                        .required(false)
                        .help("Save report to file (default: display to screen)")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                )
                .arg(
                    arg!(-f --"format" <FORMAT>)
                        .required(false)
                        .help("Report format: text, json, csv, markdown")
                        .value_parser(["text", "json", "csv", "markdown", "md"])
                        .default_value("text"),
                ),
        )
        .subcommand(
            command!("compare")
                .about(
                    "Crawl one start URL with every strategy and the single-threaded reference, \
                and report whether they agree.",
                )
                .arg(
                    arg!(-g --"graph" <PATH>)
                        .required(true)
                        .help("JSON link graph (adjacency map or {urls, edges})"),
                )
                .arg(
                    arg!(-u --"url" <URL>)
                        .required(true)
                        .help("The URL to start from")
                        .value_parser(parse_start_url),
                )
                .arg(
                    arg!(-t --"threads" <NUM_WORKERS>)
                        .required(false)
                        .help("The number of worker threads in the pool.")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("10"),
                ),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_definition_is_valid() {
        command_argument_builder().debug_assert();
    }

    #[test]
    fn test_crawl_defaults() {
        let matches = command_argument_builder()
            .try_get_matches_from(["sitewalk", "crawl", "-g", "graph.json", "-u", "http://a.com"])
            .unwrap();
        let (_, crawl) = matches.subcommand().unwrap();
        assert_eq!(crawl.get_one::<usize>("threads"), Some(&10));
        assert_eq!(crawl.get_one::<String>("strategy").map(String::as_str), Some("counted"));
        assert_eq!(crawl.get_one::<String>("format").map(String::as_str), Some("text"));
        assert!(crawl.get_one::<u64>("timeout").is_none());
    }

    #[test]
    fn test_global_verbosity_after_subcommand() {
        let matches = command_argument_builder()
            .try_get_matches_from(["sitewalk", "compare", "-g", "g.json", "-u", "http://a.com", "-vv"])
            .unwrap();
        let (_, compare) = matches.subcommand().unwrap();
        assert_eq!(compare.get_count("verbose"), 2);
    }

    #[test]
    fn test_url_and_hosts_file_conflict() {
        let result = command_argument_builder().try_get_matches_from([
            "sitewalk", "crawl", "-g", "g.json", "-u", "http://a.com", "-H", "hosts.txt",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_strategy_rejected() {
        let result = command_argument_builder().try_get_matches_from([
            "sitewalk", "crawl", "-g", "g.json", "-u", "http://a.com", "--strategy", "dfs",
        ]);
        assert!(result.is_err());
    }
}
