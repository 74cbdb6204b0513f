//
// main.rs
// dicom-organizer
//
// Binary entry point that hands off execution to the CLI layer.
//

use dicom_organizer::cli;

fn main() -> anyhow::Result<()> {
    cli::run()
}
