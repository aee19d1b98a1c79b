use std::sync::{Arc, Mutex};

use tracing::debug;

use super::{Interceptor, InterceptorError, MessageContext};
use crate::error::MqError;

/// An interceptor that logs every hook, to `tracing` or to a buffer.
pub struct LogInterceptor {
    buffer: Option<Arc<Mutex<Vec<String>>>>,
}

impl Default for LogInterceptor {
    fn default() -> Self {
        Self::new()
    }
}

impl LogInterceptor {
    pub fn new() -> Self {
        LogInterceptor { buffer: None }
    }

    pub fn with_buffer(buffer: Arc<Mutex<Vec<String>>>) -> Self {
        LogInterceptor {
            buffer: Some(buffer),
        }
    }

    fn log(
        &self,
        hook: &str,
        ctx: &MessageContext<'_>,
        failure: Option<&MqError>,
    ) -> Result<(), InterceptorError> {
        let Some(buffer) = &self.buffer else {
            debug!(
                hook,
                kind = %ctx.kind(),
                routing_key = %ctx.routing_key(),
                entry_id = ?ctx.entry_id(),
                headers = ctx.headers().len(),
                failed = failure.is_some(),
                "message hook"
            );
            return Ok(());
        };

        let mut line = format!("[{}] {} {}", hook, ctx.kind(), ctx.routing_key());
        if let Some(id) = ctx.entry_id() {
            line.push_str(&format!(" id={}", id));
        }
        if let Some(err) = failure {
            line.push_str(&format!(" failed={}", err));
        }
        buffer
            .lock()
            .map_err(|_| InterceptorError::new("log buffer poisoned"))?
            .push(line);
        Ok(())
    }
}

impl Interceptor for LogInterceptor {
    fn before_send(&self, ctx: &mut MessageContext<'_>) -> Result<(), InterceptorError> {
        self.log("SEND", ctx, None)
    }

    fn after_send(
        &self,
        ctx: &mut MessageContext<'_>,
        failure: Option<&MqError>,
    ) -> Result<(), InterceptorError> {
        self.log("SENT", ctx, failure)
    }

    fn before_consume(&self, ctx: &mut MessageContext<'_>) -> Result<(), InterceptorError> {
        self.log("CONSUME", ctx, None)
    }

    fn after_consume(
        &self,
        ctx: &mut MessageContext<'_>,
        failure: Option<&MqError>,
    ) -> Result<(), InterceptorError> {
        self.log("CONSUMED", ctx, failure)
    }
}
