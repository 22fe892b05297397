use crate::protocol::{
    AwsSpecifiers, CommandDocument, ProtoResult, ResponseDocument, ResultsDocument, TargetDocument,
};
use oc2gate_core::{
    Action, Command, CorrelationId, Response, ResponseResults, TargetSpecifiers,
};

// TargetSpecifiers
impl From<TargetSpecifiers> for AwsSpecifiers {
    fn from(target: TargetSpecifiers) -> Self {
        Self {
            image: target.image,
            instance: target.instance,
        }
    }
}

impl From<AwsSpecifiers> for TargetSpecifiers {
    fn from(spec: AwsSpecifiers) -> Self {
        Self {
            image: spec.image,
            instance: spec.instance,
        }
    }
}

// Command
impl From<&Command> for CommandDocument {
    fn from(cmd: &Command) -> Self {
        Self {
            action: cmd.action.to_string(),
            target: TargetDocument {
                newcontext: cmd.target.clone().into(),
            },
        }
    }
}

impl CommandDocument {
    /// Binds the document to the correlation id received alongside it
    pub fn into_command(self, correlation_id: CorrelationId) -> ProtoResult<Command> {
        let action: Action = self.action.parse()?;
        Ok(Command::new(
            action,
            self.target.newcontext.into(),
            correlation_id,
        ))
    }
}

// Response
impl From<&Response> for ResponseDocument {
    fn from(res: &Response) -> Self {
        Self {
            status: res.status,
            status_text: res.status_text.clone(),
            results: res.results.as_ref().map(|results| ResultsDocument {
                newcontext: AwsSpecifiers {
                    image: None,
                    instance: results.instance.clone(),
                },
            }),
        }
    }
}

impl ResponseDocument {
    pub fn into_response(self, correlation_id: CorrelationId) -> Response {
        Response {
            status: self.status,
            status_text: self.status_text,
            results: self.results.map(|results| ResponseResults {
                instance: results.newcontext.instance,
            }),
            correlation_id,
        }
    }
}
