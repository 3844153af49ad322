use acidseq::{
    cli::{default_output_path, validate_device, Args, Commands, ImportArgs, PlayArgs},
    config::Settings,
    logging,
    midi::{CancelToken, DefaultMidiEngine},
    playback::Player,
    render::{encode_pattern, render_midi_file, save_midi_file, save_pattern},
    report::{render_table, save_html},
    sequence::{save_sequence, Sequence},
    services::{nmap, services_to_sequence, Rng, Scale},
    ui::{cancel_on_interrupt, KeyWatcher, ProgressObserver},
};
use chrono::Local;
use clap::Parser;
use dialoguer::Select;
use std::error::Error;
use std::path::{Path, PathBuf};

fn main() {
    let args = parse_command_line_arguments();
    initialize_logging(args.verbose);

    if let Err(e) = run(args) {
        log::error!("{}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn initialize_logging(verbose: bool) {
    if let Err(e) = logging::init_logger(verbose) {
        eprintln!("Warning: {}", e);
    }
    log::info!("Application starting");
}

fn parse_command_line_arguments() -> Args {
    Args::parse()
}

fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let settings = Settings::load(args.config.as_deref())?;

    match args.command {
        Commands::Ports => list_available_devices(&DefaultMidiEngine::list_ports()?),
        Commands::Show { sequence } => show_sequence(&sequence.load()?),
        Commands::Play(play) => play_sequence(&play, &settings)?,
        Commands::ExportMidi(export) => {
            let sequence = export.sequence.load()?;
            let options = export.options(&settings.playback, &settings.export);
            let smf = render_midi_file(&sequence, &options)?;
            let path = output_path(export.out, &settings, &sequence, "mid");
            save_midi_file(&smf, &path)?;
            println!("Saved MIDI file to {}", path.display());
        }
        Commands::ExportSysex(export) => {
            let sequence = export.sequence.load()?;
            let frame = encode_pattern(&sequence, &export.slot(&settings.export))?;
            let path = output_path(export.out, &settings, &sequence, "syx");
            save_pattern(&frame, &path)?;
            println!("Saved SysEx pattern to {}", path.display());
        }
        Commands::ExportHtml {
            sequence,
            out,
            title,
        } => {
            let sequence = sequence.load()?;
            let path = output_path(out, &settings, &sequence, "html");
            save_html(&sequence, title.as_deref(), &path)?;
            println!("Saved HTML table to {}", path.display());
        }
        Commands::Import(import) => import_scan(&import, &settings)?,
    }
    Ok(())
}

fn output_path(explicit: Option<PathBuf>, settings: &Settings, sequence: &Sequence, extension: &str) -> PathBuf {
    explicit.unwrap_or_else(|| {
        default_output_path(
            Path::new(&settings.export.directory),
            sequence.name(),
            extension,
            Local::now(),
        )
    })
}

fn list_available_devices(devices: &[String]) {
    if devices.is_empty() {
        println!("No MIDI output ports found");
        return;
    }
    println!("Available MIDI output ports:");
    for device in devices {
        println!("  - {}", device);
    }
}

fn show_sequence(sequence: &Sequence) {
    println!("{}", sequence);
    println!();
    print!("{}", render_table(sequence));
}

/// Uses the configured port, or asks which one to use.
fn select_output(configured: Option<&str>) -> Result<String, Box<dyn Error>> {
    let devices = DefaultMidiEngine::list_ports()?;
    if devices.is_empty() {
        return Err("No MIDI output ports available".into());
    }

    if let Some(device_name) = configured {
        validate_device(device_name, &devices)?;
        return Ok(device_name.to_string());
    }

    let index = Select::new()
        .with_prompt("Select a MIDI output")
        .items(&devices)
        .default(0)
        .interact()?;
    Ok(devices[index].clone())
}

fn play_sequence(play: &PlayArgs, settings: &Settings) -> Result<(), Box<dyn Error>> {
    let sequence = play.sequence.load()?;
    let options = play.options(&settings.playback);
    let device_name = select_output(play.output(&settings.playback))?;
    let engine = DefaultMidiEngine::open(&device_name)?;

    log::info!("Successfully connected to MIDI device: {}", engine.port_name());
    println!("{}", sequence);
    println!(
        "Playing on {} at {} BPM. Press q, Esc or Ctrl+C to stop.",
        engine.port_name(),
        options.bpm
    );

    let cancel = CancelToken::new();
    let observer = ProgressObserver::new(&sequence, options.repetitions);
    let player = Player::new(engine, options).with_observer(Box::new(observer));

    // Raw mode swallows Ctrl+C, so this only fires without the key watcher.
    if let Err(e) = cancel_on_interrupt(cancel.clone()) {
        log::warn!("Could not install Ctrl+C handler: {}", e);
    }
    let watcher = match KeyWatcher::spawn(cancel.clone()) {
        Ok(watcher) => Some(watcher),
        Err(e) => {
            log::warn!("Keyboard control unavailable: {}", e);
            None
        }
    };
    let result = player.play(&sequence, &cancel);
    drop(watcher);

    let report = result?;
    if report.cancelled {
        println!("Stopped after {} steps", report.steps_played);
    } else {
        println!("Played {} passes", report.iterations);
    }
    Ok(())
}

fn import_scan(import: &ImportArgs, settings: &Settings) -> Result<(), Box<dyn Error>> {
    let services = nmap::parse_file(&import.xml)?;
    println!("Found {} open services:", services.len());
    for service in &services {
        println!("  {}", service);
    }

    let scale_name = import
        .scale
        .as_deref()
        .unwrap_or(&settings.mapping.default_scale);
    let notes = settings.scale_notes(scale_name).ok_or_else(|| {
        let known: Vec<&str> = settings.mapping.scales.keys().map(String::as_str).collect();
        format!("Unknown scale '{}' (known: {})", scale_name, known.join(", "))
    })?;
    let scale = Scale::new(scale_name, notes);

    let mut rng = match import.seed {
        Some(seed) => Rng::new_with_seed(seed),
        None => Rng::from_clock(),
    };
    let name = import.name.as_deref().unwrap_or("scan import");
    let sequence = services_to_sequence(&services, name, &scale, &settings.mapping, &mut rng)?;

    show_sequence(&sequence);
    let path = output_path(import.out.clone(), settings, &sequence, "json");
    save_sequence(&sequence, &path)?;
    println!("Saved sequence to {}", path.display());
    Ok(())
}
