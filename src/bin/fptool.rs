use clap::{Parser, Subcommand};
use ridgeprint::tools::{
    bench_limit_from_env, binary_stats, class_from_path, dataset_iter, dataset_root_from_env,
    export_analysis, grayscale_stats, load_luma, write_minutiae_json,
};
use ridgeprint::{
    FingerprintClass, Matrix, PipelineParams, analyze_image, classify_batch, env_params,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "fptool", version, about = "Ridgeprint CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the full pipeline on one image and optionally dump every stage
    Analyze {
        #[arg(long)]
        image: PathBuf,
        /// JSON parameter file (defaults plus FP_* overrides otherwise)
        #[arg(long)]
        params: Option<PathBuf>,
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
    /// Export minutiae of one image as JSON
    Minutiae {
        #[arg(long)]
        image: PathBuf,
        #[arg(long)]
        params: Option<PathBuf>,
        #[arg(long, default_value = "minutiae.json")]
        output: PathBuf,
    },
    /// Classify every image under a directory and report the error rate
    Classify {
        #[arg(long)]
        dir: Option<PathBuf>,
        /// Expected class for every image; otherwise taken from the parent directory name
        #[arg(long)]
        expected: Option<FingerprintClass>,
        #[arg(long)]
        params: Option<PathBuf>,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Print the default parameters as JSON
    Params,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Analyze {
            image,
            params,
            out_dir,
        } => analyze_cmd(&image, params.as_deref(), out_dir.as_deref()),
        Command::Minutiae {
            image,
            params,
            output,
        } => minutiae_cmd(&image, params.as_deref(), &output),
        Command::Classify {
            dir,
            expected,
            params,
            limit,
        } => classify_cmd(dir, expected, params.as_deref(), limit),
        Command::Params => params_cmd(),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn load_params(path: Option<&Path>) -> ridgeprint::Result<PipelineParams> {
    match path {
        Some(path) => PipelineParams::load(path),
        None => Ok(env_params().clone()),
    }
}

fn analyze_cmd(image: &Path, params: Option<&Path>, out_dir: Option<&Path>) -> ridgeprint::Result<()> {
    let params = load_params(params)?;
    let gray = load_luma(image)?;
    let stats = grayscale_stats(&gray);
    println!("Image: {} ({}x{})", image.display(), gray.width(), gray.height());
    println!(
        "Grayscale range: {}-{}, average: {}",
        stats.min, stats.max, stats.avg
    );

    let start = Instant::now();
    let analysis = analyze_image(&gray, &params)?;
    let elapsed = start.elapsed();

    let roi = binary_stats(&analysis.roi);
    let ridges = binary_stats(&analysis.filtered);
    let skeleton = binary_stats(&analysis.skeleton);
    println!("Region of interest: {:.1}%", roi.set_ratio * 100.0);
    println!(
        "Ridge pixels: {} ({:.1}%), skeleton pixels: {}",
        ridges.set_pixels,
        ridges.set_ratio * 100.0,
        skeleton.set_pixels
    );
    println!(
        "Minutiae: {} bifurcations, {} ridge endings",
        analysis.minutiae_maps.bifurcations.count_ones(),
        analysis.minutiae_maps.ridge_endings.count_ones()
    );
    for singularity in analysis.singularities.to_singularities() {
        println!(
            "  {:?} at ({}, {})",
            singularity.kind, singularity.x, singularity.y
        );
    }
    println!("Class: {} ({:.2?})", analysis.class, elapsed);

    if let Some(dir) = out_dir {
        let written = export_analysis(&analysis, dir)?;
        println!("Wrote {} files to {}", written.len(), dir.display());
    }
    Ok(())
}

fn minutiae_cmd(image: &Path, params: Option<&Path>, output: &Path) -> ridgeprint::Result<()> {
    let params = load_params(params)?;
    let gray = load_luma(image)?;
    let analysis = analyze_image(&gray, &params)?;
    let export = analysis.minutiae_export();
    write_minutiae_json(output, &export)?;
    println!(
        "Wrote {} bifurcations and {} ridge endings to {}",
        export.bifurcations.len(),
        export.ridge_endings.len(),
        output.display()
    );
    Ok(())
}

fn classify_cmd(
    dir: Option<PathBuf>,
    expected: Option<FingerprintClass>,
    params: Option<&Path>,
    limit: Option<usize>,
) -> ridgeprint::Result<()> {
    let params = load_params(params)?;
    let root = dir.unwrap_or_else(dataset_root_from_env);
    let limit = limit.or_else(bench_limit_from_env);

    let mut paths = Vec::new();
    let mut images: Vec<Matrix<u8>> = Vec::new();
    for path in dataset_iter(&root, limit) {
        match load_luma(&path) {
            Ok(gray) => {
                paths.push(path);
                images.push(gray);
            }
            Err(err) => eprintln!("Skipping {}: {}", path.display(), err),
        }
    }
    if images.is_empty() {
        println!("No images found in {}", root.display());
        return Ok(());
    }

    let start = Instant::now();
    let results = classify_batch(&images, &params);
    let elapsed = start.elapsed();

    let mut scored = 0usize;
    let mut wrong = 0usize;
    let mut failed = 0usize;
    for (path, result) in paths.iter().zip(&results) {
        let truth = expected.or_else(|| class_from_path(path));
        match result {
            Ok(classification) => {
                let verdict = match truth {
                    Some(truth) => {
                        scored += 1;
                        if truth == classification.class {
                            "ok"
                        } else {
                            wrong += 1;
                            "MISS"
                        }
                    }
                    None => "-",
                };
                println!(
                    "{:<4} {} -> {}",
                    verdict,
                    path.display(),
                    classification.class
                );
            }
            Err(err) => {
                failed += 1;
                println!("FAIL {}: {}", path.display(), err);
            }
        }
    }

    println!(
        "Classified {} images in {:.2?} ({} failed)",
        images.len(),
        elapsed,
        failed
    );
    if scored > 0 {
        println!(
            "Error rate: {}/{} = {:.2}%",
            wrong,
            scored,
            wrong as f64 * 100.0 / scored as f64
        );
    }
    Ok(())
}

fn params_cmd() -> ridgeprint::Result<()> {
    println!("{}", PipelineParams::default().to_json()?);
    Ok(())
}
