use std::sync::Arc;

use service::{
    auth::AuthService,
    media::ImageHost,
    notify::{Mailer, Sender},
    visitors::VisitorService,
};

/// Everything a handler can reach. Cheap to clone; all members are shared handles.
#[derive(Clone)]
pub struct ServerState {
    pub auth: AuthService,
    pub visitors: VisitorService,
    pub images: Arc<dyn ImageHost>,
    pub mailer: Arc<dyn Mailer>,
    pub sender: Sender,
}
