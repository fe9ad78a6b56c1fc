extern crate clap;
use clap::*;

mod cmd_dada;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let app = Command::new("dada")
        .version(crate_version!())
        .author(crate_authors!())
        .about("`dada` - Divisive Amplicon Denoising Algorithm")
        .propagate_version(true)
        .arg_required_else_help(true)
        .color(ColorChoice::Auto)
        .subcommand(cmd_dada::denoise::make_subcommand())
        .subcommand(cmd_dada::calibrate::make_subcommand())
        .subcommand(cmd_dada::align::make_subcommand())
        .after_help(
            r###"Subcommands:

* denoise   - Infer true sequences from dereplicated amplicon reads
* calibrate - Alignment distance against k-mer distance for sampled pairs
* align     - Ends-free banded alignment of two sequences

Log verbosity follows RUST_LOG, e.g. `RUST_LOG=info dada denoise uniques.tsv`.

"###,
        );

    // Check which subcomamnd the user ran...
    match app.get_matches().subcommand() {
        Some(("denoise", sub_matches)) => cmd_dada::denoise::execute(sub_matches),
        Some(("calibrate", sub_matches)) => cmd_dada::calibrate::execute(sub_matches),
        Some(("align", sub_matches)) => cmd_dada::align::execute(sub_matches),
        _ => unreachable!(),
    }?;

    Ok(())
}
