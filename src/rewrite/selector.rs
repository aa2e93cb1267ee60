use crate::{
    error::GateError,
    metrics,
    rewrite::{
        diagnostics::Diagnostics,
        resolver::{LiveDescriptor, PlaybackDescriptor, SelectionInputs},
    },
};

/// Outcome of the decision table, before any values are attached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Redirect to the live stream. `seek_ignored` is set when a seek
    /// position arrived without a usable playback descriptor.
    Live { seek_ignored: bool },
    /// Redirect to the playback stream
    Playback,
    /// Nothing usable to redirect to
    NoSource,
}

/// Live-vs-playback decision table.
///
/// | seek | playback | live | outcome |
/// |------|----------|------|---------|
/// | yes  | yes      | any  | playback |
/// | no   | any      | yes  | live |
/// | yes  | no       | yes  | live, seek dropped |
/// | any  | yes      | no   | playback |
/// | any  | no       | no   | no source |
pub fn select_mode(has_live: bool, has_playback: bool, has_seek: bool) -> Mode {
    match (has_live, has_playback, has_seek) {
        (_, true, true) => Mode::Playback,
        (true, _, false) => Mode::Live {
            seek_ignored: false,
        },
        (true, false, true) => Mode::Live { seek_ignored: true },
        (false, true, _) => Mode::Playback,
        (false, false, _) => Mode::NoSource,
    }
}

/// Terminal per-request decision
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    RedirectLive {
        stream: LiveDescriptor,
        fcc: Option<String>,
        token: Option<String>,
    },
    RedirectPlayback {
        stream: PlaybackDescriptor,
        seek: Option<String>,
        token: Option<String>,
    },
    Reject(GateError),
}

impl Decision {
    /// Metrics/diagnostic label
    pub fn label(&self) -> &'static str {
        match self {
            Decision::RedirectLive { .. } => "live",
            Decision::RedirectPlayback { .. } => "playback",
            Decision::Reject(_) => "reject",
        }
    }
}

/// Attach resolved values to the mode chosen by [`select_mode`].
pub fn decide(inputs: &SelectionInputs, diag: &Diagnostics) -> Decision {
    let mode = select_mode(inputs.has_live(), inputs.has_playback(), inputs.has_seek());

    let decision = match (mode, &inputs.live, &inputs.playback) {
        (Mode::Live { seek_ignored }, Some(live), _) => {
            if seek_ignored {
                metrics::record_ignored_seek();
                diag.warn(format!(
                    "playseek={} ignored: no valid rtsp source, serving live",
                    inputs.seek.as_deref().unwrap_or_default()
                ));
            }
            Decision::RedirectLive {
                stream: live.clone(),
                fcc: inputs.fcc.clone(),
                token: inputs.token.clone(),
            }
        }
        (Mode::Playback, _, Some(playback)) => Decision::RedirectPlayback {
            stream: playback.clone(),
            seek: inputs.seek.clone(),
            token: inputs.token.clone(),
        },
        _ => Decision::Reject(GateError::NoValidSource),
    };

    diag.info(format!("mode selected: {}", decision.label()));
    metrics::record_decision(decision.label());
    decision
}
