use clap::Parser;

const DEFAULT_DELAY_SECS: f64 = 3.;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Fade duration in seconds.
    #[arg(
        short,
        long,
        value_name = "SECONDS",
        default_value_t = DEFAULT_DELAY_SECS,
        value_parser = parse_seconds,
        allow_negative_numbers = true,
    )]
    pub delay: f64,
}

impl Cli {
    /// Fade duration in milliseconds, truncated toward zero.
    pub fn delay_ms(&self) -> i64 {
        (self.delay * 1000.) as i64
    }
}

fn parse_seconds(value: &str) -> Result<f64, String> {
    let secs: f64 = value
        .parse()
        .map_err(|_| format!("`{value}` is not a number"))?;

    if !secs.is_finite() {
        return Err(format!("`{value}` is not a finite number"));
    }

    Ok(secs)
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use clap::error::ErrorKind;

    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("dusk").chain(args.iter().copied()))
    }

    #[test]
    fn default_delay() {
        let cli = parse(&[]).unwrap();
        assert_relative_eq!(cli.delay, 3.);
        assert_eq!(cli.delay_ms(), 3000);
    }

    #[test]
    fn delay_is_truncated_to_ms() {
        assert_eq!(parse(&["-d", "1.5"]).unwrap().delay_ms(), 1500);
        assert_eq!(parse(&["-d", "0.0019"]).unwrap().delay_ms(), 1);
        assert_eq!(parse(&["--delay", "10"]).unwrap().delay_ms(), 10_000);
        assert_eq!(parse(&["-d0.25"]).unwrap().delay_ms(), 250);
    }

    #[test]
    fn non_positive_delay_is_accepted() {
        assert_eq!(parse(&["-d", "0"]).unwrap().delay_ms(), 0);
        assert_eq!(parse(&["-d", "-2"]).unwrap().delay_ms(), -2000);
    }

    #[test]
    fn invalid_delay_is_rejected() {
        for value in ["abc", "1.5s", " 1", "1e", "inf", "NaN"] {
            let err = parse(&["-d", value]).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::ValueValidation, "{value:?}");
            assert!(err.use_stderr());
        }
    }

    #[test]
    fn unknown_flag_is_rejected() {
        let err = parse(&["-x"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownArgument);
        assert!(err.use_stderr());

        let err = parse(&["-d"]).unwrap_err();
        assert!(err.use_stderr());
    }

    #[test]
    fn help_is_not_an_error() {
        let err = parse(&["-h"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DisplayHelp);
        assert!(!err.use_stderr());
    }
}
