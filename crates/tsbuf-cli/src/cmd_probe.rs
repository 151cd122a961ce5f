/// Implementation of `tsbuf probe`.
///
/// # Example output
///
/// ```text
/// Source:       capture.ts
/// Packet size:  188 bytes
/// Probe:        193 bytes
/// Resync:       rewound to offset 0
/// ```
use anyhow::{Context, Result};
use tsbuf_wire::{Detection, Resync, SyncDetector};

use crate::{ProbeArgs, input_name, open_input};

/// Run the `tsbuf probe` command.
///
/// # Errors
///
/// Returns an error if the input cannot be opened or its packet size
/// cannot be detected.
pub fn run(args: &ProbeArgs) -> Result<()> {
    let name = input_name(&args.input);
    let mut source = open_input(&args.input)?;
    let detection = SyncDetector::new()
        .detect(&mut source)
        .with_context(|| format!("cannot detect packet size of {name}"))?;
    log::debug!("{name}: {detection:?}");

    print!("{}", render(&name, &detection));
    Ok(())
}

fn render(name: &str, detection: &Detection) -> String {
    let resync = match detection.resync {
        Resync::Rewound => "rewound to offset 0".to_string(),
        Resync::Skipped(n) => format!("skipped {n} bytes"),
    };
    format!(
        "{:<14}{name}\n{:<14}{} bytes\n{:<14}{} bytes\n{:<14}{resync}\n",
        "Source:", "Packet size:", detection.packet_size, "Probe:", detection.probe_len, "Resync:",
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_rewound_detection() {
        let detection = Detection {
            packet_size: 188,
            probe_len: 193,
            resync: Resync::Rewound,
        };
        insta::assert_snapshot!(render("capture.ts", &detection), @r"
        Source:       capture.ts
        Packet size:  188 bytes
        Probe:        193 bytes
        Resync:       rewound to offset 0
        ");
    }

    #[test]
    fn renders_skipped_detection() {
        let detection = Detection {
            packet_size: 204,
            probe_len: 205,
            resync: Resync::Skipped(203),
        };
        insta::assert_snapshot!(render("<stdin>", &detection), @r"
        Source:       <stdin>
        Packet size:  204 bytes
        Probe:        205 bytes
        Resync:       skipped 203 bytes
        ");
    }
}
