#![allow(clippy::missing_errors_doc)]
#![allow(missing_docs)]

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use itertools::Itertools;
use mocc::config::{self, Configuration};
use mocc::driver::EigenvalueSolver;
use mocc::output::SolverOutput;
use prettytable::{row, Table};

/// Build and run `mocc` neutron transport eigenvalue problems from a YAML configuration.
///
/// XML input parsing and HDF5 output are out of scope for this crate (`spec.md` §1); this CLI
/// accepts the programmatic [`Configuration`] directly, the way `pineappl_cli`'s commands operate
/// on an already-built grid rather than parsing one from scratch.
#[derive(Parser)]
#[command(name = "mocc", version)]
pub struct Opts {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Runs a CMFD-accelerated power iteration to convergence and prints the result.
    Solve(SolveArgs),
    /// Parses a configuration and reports its geometry/quadrature statistics without solving.
    Check(SolveArgs),
}

#[derive(Parser)]
pub struct SolveArgs {
    /// Path to a YAML-encoded [`Configuration`].
    pub config: PathBuf,
    /// Disables CMFD acceleration (plain MoC power iteration).
    #[arg(long)]
    pub no_cmfd: bool,
    /// Maximum outer iterations.
    #[arg(long, default_value_t = 100)]
    pub max_outer: usize,
    /// Eigenvalue convergence tolerance.
    #[arg(long, default_value_t = 1e-6)]
    pub tol_k: f64,
}

fn load_configuration(path: &PathBuf) -> Result<Configuration> {
    let text = fs::read_to_string(path).with_context(|| format!("reading configuration {}", path.display()))?;
    serde_yaml::from_str(&text).with_context(|| format!("parsing configuration {}", path.display()))
}

impl Opts {
    /// Dispatches to the selected subcommand.
    pub fn run(self) -> Result<()> {
        match self.command {
            Command::Solve(args) => solve(&args),
            Command::Check(args) => check(&args),
        }
    }
}

fn check(args: &SolveArgs) -> Result<()> {
    let config = load_configuration(&args.config)?;
    let inputs = config::build(&config)?;

    let mut table = Table::new();
    table.add_row(row!["property", "value"]);
    table.add_row(row!["energy groups", config.eubounds.len()]);
    table.add_row(row!["fsr count", inputs.mesh.n_reg()]);
    table.add_row(row!["unique planes", inputs.mesh.n_unique_planes()]);
    table.add_row(row!["angles per octant", inputs.quad.n_dir_oct()]);
    table.add_row(row!["total angles", inputs.quad.n_dir()]);
    table.printstd();

    print_warnings();
    Ok(())
}

fn solve(args: &SolveArgs) -> Result<()> {
    let config = load_configuration(&args.config)?;
    let inputs = config::build(&config)?;

    let solver = EigenvalueSolver {
        tol_k: args.tol_k,
        max_outer: args.max_outer,
        use_cmfd: !args.no_cmfd,
        ..EigenvalueSolver::default()
    };
    let (k, flux, history) = solver.solve(&inputs.mesh, &inputs.ray_data, &inputs.quad, &config.eubounds)?;
    let output = SolverOutput::new(&inputs.mesh, &flux, k, inputs.quad, history, None);

    let mut summary = Table::new();
    summary.add_row(row!["outer iteration", "k", "fission source L2", "flux residual"]);
    for (i, rec) in output.history.records.iter().enumerate() {
        summary.add_row(row![i, format!("{:.8}", rec.k), format!("{:.3e}", rec.fission_source_l2), format!("{:.3e}", rec.flux_residual)]);
    }
    summary.printstd();

    println!("\nconverged k = {:.8}", output.k);
    print_warnings();
    Ok(())
}

fn print_warnings() {
    let warnings = mocc::warn::drain();
    if warnings.is_empty() {
        return;
    }
    eprintln!("\n{} warning(s):", warnings.len());
    eprintln!("{}", warnings.iter().map(|w| format!("  - {}", w.message)).join("\n"));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_command() {
        use clap::CommandFactory;
        Opts::command().debug_assert();
    }
}
