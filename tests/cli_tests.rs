#[cfg(test)]
mod tests {
    use acidseq::cli::{default_output_path, slugify, validate_device, Commands, SequenceSource};
    use acidseq::config::Settings;
    use acidseq::*;
    use chrono::{Local, TimeZone};
    use clap::Parser;
    use std::path::{Path, PathBuf};

    fn devices() -> Vec<String> {
        vec!["Mock Device 1".to_string(), "TD-3 MIDI 1".to_string()]
    }

    #[test]
    fn test_ports_command() {
        let args = Args::parse_from(["acidseq", "ports"]);
        assert!(matches!(args.command, Commands::Ports));
        assert!(!args.verbose);
        assert_eq!(args.config, None);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = Args::parse_from(["acidseq", "show", "demo", "--verbose", "--config", "a.toml"]);
        assert!(args.verbose);
        assert_eq!(args.config, Some(PathBuf::from("a.toml")));
        match args.command {
            Commands::Show { sequence } => assert_eq!(sequence, SequenceSource::Demo),
            other => panic!("Expected show command, got {:?}", other),
        }
    }

    #[test]
    fn test_play_args_override_settings() {
        let args = Args::parse_from([
            "acidseq", "play", "bass.json", "--bpm", "133", "-c", "2", "--clock", "-o", "TD-3",
        ]);
        let Commands::Play(play) = args.command else {
            panic!("Expected play command");
        };
        assert_eq!(play.sequence, SequenceSource::File(PathBuf::from("bass.json")));

        let settings = Settings::default();
        let options = play.options(&settings.playback);
        assert_eq!(options.bpm, 133.0);
        assert_eq!(options.channel, 2);
        assert_eq!(options.repetitions, 4);
        assert!(options.send_clock);
        assert_eq!(play.output(&settings.playback), Some("TD-3"));
    }

    #[test]
    fn test_play_demo_uses_its_own_tempo_and_clock() {
        let settings = Settings::default();
        let options_for = |argv: &[&str]| {
            let Commands::Play(play) = Args::parse_from(argv).command else {
                panic!("Expected play command");
            };
            play.options(&settings.playback)
        };

        let demo = options_for(&["acidseq", "play", "demo"]);
        assert_eq!(demo.bpm, Sequence::DEMO_BPM);
        assert_eq!(demo.bpm, 111.0);
        assert!(demo.send_clock);
        assert_eq!(demo.repetitions, settings.playback.repetitions);

        let overridden = options_for(&["acidseq", "play", "demo", "--bpm", "130", "--no-clock"]);
        assert_eq!(overridden.bpm, 130.0);
        assert!(!overridden.send_clock);

        let file = options_for(&["acidseq", "play", "bass.json"]);
        assert_eq!(file.bpm, settings.playback.bpm);
        assert!(!file.send_clock);

        assert!(Args::try_parse_from(["acidseq", "play", "demo", "--clock", "--no-clock"]).is_err());
    }

    #[test]
    fn test_play_falls_back_to_configured_output() {
        let args = Args::parse_from(["acidseq", "play", "demo"]);
        let Commands::Play(play) = args.command else {
            panic!("Expected play command");
        };
        let mut settings = Settings::default();
        assert_eq!(play.output(&settings.playback), None);
        settings.playback.output = Some("Mock Device 1".to_string());
        assert_eq!(play.output(&settings.playback), Some("Mock Device 1"));
    }

    #[test]
    fn test_export_args() {
        let args = Args::parse_from(["acidseq", "export-midi", "demo", "--ppq", "96"]);
        let Commands::ExportMidi(export) = args.command else {
            panic!("Expected export-midi command");
        };
        let settings = Settings::default();
        let options = export.options(&settings.playback, &settings.export);
        assert_eq!(options.ppq, 96);
        assert_eq!(options.repetitions, 1);

        let args = Args::parse_from(["acidseq", "export-sysex", "demo", "-g", "2", "-p", "9", "--triplet"]);
        let Commands::ExportSysex(export) = args.command else {
            panic!("Expected export-sysex command");
        };
        let slot = export.slot(&settings.export);
        assert_eq!((slot.group, slot.pattern, slot.triplet), (2, 9, true));
    }

    #[test]
    fn test_import_args() {
        let args = Args::parse_from(["acidseq", "import", "scan.xml", "--seed", "7", "-s", "blues"]);
        let Commands::Import(import) = args.command else {
            panic!("Expected import command");
        };
        assert_eq!(import.xml, PathBuf::from("scan.xml"));
        assert_eq!(import.seed, Some(7));
        assert_eq!(import.scale.as_deref(), Some("blues"));
        assert_eq!(import.name, None);
    }

    #[test]
    fn test_demo_source_loads() {
        let sequence = SequenceSource::Demo.load().unwrap();
        assert_eq!(sequence.len(), 16);
    }

    #[test]
    fn test_valid_device_binding() {
        assert!(validate_device("TD-3", &devices()).is_ok());
    }

    #[test]
    fn test_invalid_device_binding() {
        let error = validate_device("Nonexistent Device", &devices()).unwrap_err();
        assert!(error.contains("Nonexistent Device"));
        assert!(error.contains("  - Mock Device 1"));
    }

    #[test]
    fn test_default_output_path() {
        let now = Local.with_ymd_and_hms(2024, 3, 9, 21, 5, 0).unwrap();
        let path = default_output_path(Path::new("exports"), "Daft Punk - Da Funk", "mid", now);
        assert_eq!(path, PathBuf::from("exports/daft-punk-da-funk-20240309-210500.mid"));
        assert_eq!(slugify("***"), "sequence");
    }
}
