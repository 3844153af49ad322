//! Turning discovered services into steps
//!
//! Each open port becomes one sounding step. The port number picks a scale
//! degree, service text decides accent and tie, and the remaining slots of
//! the pattern are scattered rests.

use super::{ImportError, PortService};
use crate::config::MappingSettings;
use crate::sequence::{Octave, Sequence, SequenceError, StepKind, PATTERN_STEPS};
use log::{debug, info, warn};
use std::time::{SystemTime, UNIX_EPOCH};

const SHORT_PATTERN: usize = 8;

/// Random source for rest placement and octave choice.
pub struct Rng(oorandom::Rand32);

impl Rng {
    pub fn new_with_seed(seed: u64) -> Self {
        Self(oorandom::Rand32::new(seed))
    }

    /// Seeded from the system clock.
    pub fn from_clock() -> Self {
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or_default();
        debug!("Seeding mapping RNG with {}", seed);
        Self::new_with_seed(seed)
    }

    /// Uniform in `0..bound`; `bound` must be non-zero.
    pub fn below(&mut self, bound: usize) -> usize {
        self.0.rand_range(0..bound as u32) as usize
    }

    pub fn coin(&mut self) -> bool {
        self.0.rand_u32() & 1 == 1
    }

    /// Half the time no shift, otherwise up or down an octave.
    fn octave(&mut self) -> Octave {
        if self.coin() {
            Octave::Zero
        } else if self.coin() {
            Octave::Up
        } else {
            Octave::Down
        }
    }
}

/// A named set of semitone offsets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scale {
    pub name: String,
    pub notes: Vec<u8>,
}

impl Scale {
    pub fn new(name: &str, notes: &[u8]) -> Self {
        Self {
            name: name.to_string(),
            notes: notes.to_vec(),
        }
    }

    /// Scale degree picked by `port`.
    pub fn degree_for(&self, port: u16) -> Option<u8> {
        if self.notes.is_empty() {
            return None;
        }
        self.notes.get(usize::from(port) % self.notes.len()).copied()
    }
}

fn is_accent(keywords: &[String], full_name: &str) -> bool {
    let haystack = full_name.to_lowercase();
    keywords.iter().any(|keyword| {
        let cleaned = keyword
            .trim()
            .trim_matches(|c| c == '\'' || c == '"')
            .to_lowercase();
        !cleaned.is_empty() && haystack.contains(&cleaned)
    })
}

/// Builds a sequence with one sounding step per service.
pub fn services_to_sequence(
    services: &[PortService],
    name: &str,
    scale: &Scale,
    settings: &MappingSettings,
    rng: &mut Rng,
) -> Result<Sequence, ImportError> {
    if services.is_empty() {
        return Err(SequenceError::InvalidArgument("no services to map".to_string()).into());
    }
    if scale.notes.is_empty() {
        return Err(
            SequenceError::InvalidArgument(format!("scale '{}' has no notes", scale.name)).into(),
        );
    }

    let services = if services.len() > PATTERN_STEPS {
        warn!(
            "{} services found, only the first {} fit in a pattern",
            services.len(),
            PATTERN_STEPS
        );
        &services[..PATTERN_STEPS]
    } else {
        services
    };

    let length = if services.len() <= SHORT_PATTERN {
        SHORT_PATTERN
    } else {
        PATTERN_STEPS
    };
    let mut sequence = Sequence::new(name, length);

    // Partial shuffle: the first `rest_count` slots become rests.
    let rest_count = length - services.len();
    let mut positions: Vec<usize> = (0..length).collect();
    for i in 0..rest_count {
        let j = i + rng.below(length - i);
        positions.swap(i, j);
    }
    let mut rests = positions[..rest_count].to_vec();
    rests.sort_unstable();
    debug!("Rest positions: {:?}", rests);

    for &index in &rests {
        sequence.set(index, 0, Octave::Zero, StepKind::Rest, false)?;
    }

    let sounding = (0..length).filter(|i| !rests.contains(i));
    for (index, service) in sounding.zip(services) {
        let full_name = service.full_name();
        let degree = scale.degree_for(service.port).unwrap_or_default();
        let pitch = u8::try_from(u16::from(degree) + u16::from(settings.octave_shift))
            .unwrap_or(u8::MAX);
        let kind = if full_name.chars().count() > settings.tie_threshold {
            StepKind::Tie
        } else {
            StepKind::Active
        };
        let accent = is_accent(&settings.accent_keywords, &full_name);
        let octave = rng.octave();

        debug!(
            "Step {} <- {}: pitch {}, {}, accent {}, octave {}",
            index, service, pitch, kind, accent, octave
        );
        sequence.set(index, pitch, octave, kind, accent)?;
        sequence.set_source(index, &format!("{}:{}", service.port, service.service_name))?;
    }

    info!(
        "Mapped {} services onto '{}' ({} steps, scale {})",
        services.len(),
        name,
        length,
        scale.name
    );
    Ok(sequence)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minor() -> Scale {
        Scale::new("minor", &[0, 2, 3, 5, 7, 8, 10])
    }

    fn services(count: u16) -> Vec<PortService> {
        (0..count)
            .map(|i| PortService::new(20 + i, "svc", "1.0"))
            .collect()
    }

    #[test]
    fn test_short_pattern_for_few_services() {
        let seq = services_to_sequence(
            &services(3),
            "short",
            &minor(),
            &MappingSettings::default(),
            &mut Rng::new_with_seed(1),
        )
        .unwrap();
        assert_eq!(seq.len(), 8);
        let rests = seq.steps().iter().filter(|s| s.kind == StepKind::Rest).count();
        assert_eq!(rests, 5);
        assert!(seq
            .steps()
            .iter()
            .filter(|s| s.kind == StepKind::Rest)
            .all(|s| s.pitch == 0 && !s.accent));
    }

    #[test]
    fn test_long_pattern_and_truncation() {
        let settings = MappingSettings::default();
        let nine = services_to_sequence(&services(9), "n", &minor(), &settings, &mut Rng::new_with_seed(2)).unwrap();
        assert_eq!(nine.len(), 16);

        let many = services_to_sequence(&services(20), "m", &minor(), &settings, &mut Rng::new_with_seed(3)).unwrap();
        assert_eq!(many.len(), 16);
        assert!(many.steps().iter().all(|s| s.kind != StepKind::Rest));
        assert_eq!(many.steps()[15].source, "35:svc");
    }

    #[test]
    fn test_services_fill_sounding_steps_in_order() {
        let services = vec![
            PortService::new(22, "ssh", "OpenSSH 8.9p1 Ubuntu 3ubuntu0.6 protocol 2.0"),
            PortService::new(21, "ftp", "vsftpd"),
            PortService::new(80, "http", "nginx"),
        ];
        let seq = services_to_sequence(
            &services,
            "scan",
            &minor(),
            &MappingSettings::default(),
            &mut Rng::new_with_seed(7),
        )
        .unwrap();

        let sounding: Vec<_> = seq.steps().iter().filter(|s| s.kind != StepKind::Rest).collect();
        assert_eq!(sounding.len(), 3);

        // 22 % 7 = 1 -> 2, 21 % 7 = 0 -> 0, 80 % 7 = 3 -> 5
        assert_eq!(sounding[0].pitch, 38);
        assert_eq!(sounding[1].pitch, 36);
        assert_eq!(sounding[2].pitch, 41);

        assert_eq!(sounding[0].kind, StepKind::Tie);
        assert_eq!(sounding[1].kind, StepKind::Active);

        assert!(!sounding[0].accent);
        assert!(sounding[1].accent);

        assert_eq!(sounding[0].source, "22:ssh");
        assert_eq!(sounding[2].source, "80:http");
    }

    #[test]
    fn test_same_seed_same_sequence() {
        let settings = MappingSettings::default();
        let a = services_to_sequence(&services(5), "a", &minor(), &settings, &mut Rng::new_with_seed(42)).unwrap();
        let b = services_to_sequence(&services(5), "a", &minor(), &settings, &mut Rng::new_with_seed(42)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_accent_keywords_are_cleaned() {
        let keywords = vec![" 'Nginx' ".to_string(), "\"\"".to_string()];
        assert!(is_accent(&keywords, "http nginx 1.24"));
        assert!(!is_accent(&keywords, "http apache"));
    }

    #[test]
    fn test_rejects_empty_input() {
        let settings = MappingSettings::default();
        let result = services_to_sequence(&[], "e", &minor(), &settings, &mut Rng::new_with_seed(1));
        assert!(matches!(result, Err(ImportError::Validation(_))));

        let empty_scale = Scale::new("none", &[]);
        let result = services_to_sequence(&services(2), "e", &empty_scale, &settings, &mut Rng::new_with_seed(1));
        assert!(matches!(result, Err(ImportError::Validation(_))));
    }

    #[test]
    fn test_octaves_stay_in_range() {
        let mut rng = Rng::new_with_seed(9);
        for _ in 0..200 {
            let octave = rng.octave();
            assert!(matches!(octave, Octave::Down | Octave::Zero | Octave::Up));
        }
        for _ in 0..200 {
            assert!(rng.below(16) < 16);
        }
    }
}
