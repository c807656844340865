pub mod effect;
pub mod migration;

use super::session::Session;
use crate::decoder::{decode_base64, encode_base64};
use crate::error::{ErrorCode, Evaluation, Failure};
use crate::operation::{AdminAction, AdminKind, VoteParams};
use crate::types::{Outcome, Proposal};

use anyhow::{anyhow, Result};
use tracing::{info, warn};

pub fn evaluate_make(session: &mut Session, action: &AdminAction) -> Evaluation<Outcome> {
    if !session.system().is_member(session.sender()) {
        return Err(ErrorCode::OperationForbidden.into());
    }
    effect::validate(session, action)?;

    Ok(Outcome::ProposalMake {
        action: action.kind().as_u16(),
        content: encode_base64(&action.encode()?),
    })
}

pub fn apply_make(session: &mut Session, action: u16, content: &str) -> Result<()> {
    let output = session.output();
    session.return_inbound();

    if session.proposal(&output.trace_id)?.is_some() {
        return Ok(());
    }

    let action =
        AdminKind::from_u16(action).ok_or_else(|| anyhow!("Unknown admin action {}", action))?;
    session.insert_proposal(Proposal {
        trace_id: output.trace_id.clone(),
        creator: output.sender.clone(),
        action,
        content: content.to_string(),
        votes: Vec::new(),
        passed_at: None,
        applied_at: None,
        version: 0,
        created_at: output.created_at,
    });
    info!("Proposal {} {:?} made by {}", output.trace_id, action, output.sender);
    Ok(())
}

pub fn evaluate_vote(session: &mut Session, params: &VoteParams) -> Evaluation<Outcome> {
    if !session.system().is_member(session.sender()) {
        return Err(ErrorCode::OperationForbidden.into());
    }
    session
        .proposal(&params.trace_id)?
        .ok_or(ErrorCode::InvalidArgument)?;

    Ok(Outcome::ProposalVote {
        trace_id: params.trace_id.clone(),
    })
}

/// Records the vote once per member. The vote that reaches the threshold
/// passes the proposal and applies its effect in the same commit; later
/// votes only accumulate.
pub fn apply_vote(session: &mut Session, trace_id: &str) -> Result<()> {
    let voter = session.sender();
    session.return_inbound();

    let proposal = session
        .proposal(trace_id)?
        .ok_or_else(|| anyhow!("Proposal {} not found", trace_id))?;
    if proposal.votes.iter().any(|v| v == voter) {
        return Ok(());
    }

    let threshold = session.system().threshold;
    let now = session.now();
    let proposal = session.proposal_mut(trace_id)?;
    proposal.votes.push(voter.to_string());
    if proposal.is_passed() || proposal.votes.len() < threshold {
        return Ok(());
    }
    proposal.passed_at = Some(now);
    let (action, content) = (proposal.action, proposal.content.clone());
    info!("Proposal {} passed with {} votes", trace_id, proposal.votes.len());

    let decoded = decode_base64(&content)
        .ok_or(ErrorCode::InvalidArgument)
        .and_then(|bytes| AdminAction::decode(action, &bytes));
    let applied = match decoded {
        Ok(action) => effect::apply(session, &action),
        Err(code) => Err(code.into()),
    };

    match applied {
        Ok(()) => {
            session.proposal_mut(trace_id)?.applied_at = Some(now);
            info!("Proposal {} applied", trace_id);
            Ok(())
        }
        Err(Failure::Rejected(code)) => {
            warn!("Proposal {} passed but its effect was rejected: {}", trace_id, code);
            Ok(())
        }
        Err(Failure::Fatal(e)) => Err(e),
    }
}
