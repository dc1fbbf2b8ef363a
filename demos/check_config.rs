use refuge_certgen::config::document_dir;
use refuge_certgen::{Batch, ConfigLoader};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), refuge_certgen::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "demos/certificate_config.yaml".to_string());

    // `load_resolved` reads the document alone; CERTGEN__* overrides need the loader.
    let config = ConfigLoader::builder()
        .with_file(&path, true)
        .with_default_env()
        .build()?;
    let batch = Batch::builder()
        .with_config(config.resolve_paths(document_dir(&path)?))
        .build()?;

    let config = batch.config();
    println!("template: {}", config.template_pdf_path.display());
    println!("output:   {}", config.output_folder.display());
    println!("names from field `{}`", config.name_field);
    for (name, spec) in &config.fields {
        let column = config.column_for(name).unwrap_or("-");
        println!(
            "  {name:<14} column={column:<26} at ({:>5.1}%, {:>5.1}%) {}pt {} rgb{:?}",
            spec.x_percent,
            spec.y_percent,
            spec.font_size,
            spec.alignment,
            spec.color.rgb(),
        );
    }

    match config.check_assets() {
        Ok(()) => println!("all assets present"),
        Err(e) => println!("not ready to render: {e}"),
    }

    let preview = batch.test_job();
    println!("test certificate would be written to {}", preview.output_path.display());
    for stamp in preview.stamps(config) {
        println!("  {} = {:?}", stamp.field, stamp.text);
    }

    Ok(())
}
