//! JSON encoding of OpenC2 commands and responses.

use crate::protocol::{CommandDocument, ProtoError, ProtoResult, ResponseDocument};
use oc2gate_core::{Command, CorrelationId, Response};

pub fn encode_command(command: &Command) -> ProtoResult<Vec<u8>> {
    serde_json::to_vec(&CommandDocument::from(command)).map_err(|e| ProtoError::Encode(e.to_string()))
}

pub fn decode_command(body: &[u8], correlation_id: CorrelationId) -> ProtoResult<Command> {
    let doc: CommandDocument =
        serde_json::from_slice(body).map_err(|e| ProtoError::Malformed(e.to_string()))?;
    doc.into_command(correlation_id)
}

pub fn encode_response(response: &Response) -> ProtoResult<Vec<u8>> {
    serde_json::to_vec(&ResponseDocument::from(response))
        .map_err(|e| ProtoError::Encode(e.to_string()))
}

pub fn decode_response(body: &[u8], correlation_id: CorrelationId) -> ProtoResult<Response> {
    let doc: ResponseDocument =
        serde_json::from_slice(body).map_err(|e| ProtoError::Malformed(e.to_string()))?;
    Ok(doc.into_response(correlation_id))
}
