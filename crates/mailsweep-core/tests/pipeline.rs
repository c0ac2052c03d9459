//! End-to-end runs against an in-memory mailbox.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use mailsweep_core::protocol::{move_message, search_uids, union_searches};
use mailsweep_core::{
    Connector, EmailAction, Error, MailSession, Orchestrator, ProgressReporter, RunSettings,
    Rules, Totals,
};
use mailsweep_imap::{Flag, SearchCriteria, StoreAction, Uid};

#[derive(Debug, Clone)]
struct Message {
    uid: u32,
    from: Option<String>,
    subject: String,
    list_unsubscribe: bool,
    flagged: bool,
    deleted: bool,
    /// The server answers a header fetch with no data.
    headerless: bool,
}

impl Message {
    fn new(uid: u32, from: &str, subject: &str) -> Self {
        Self {
            uid,
            from: Some(from.to_string()),
            subject: subject.to_string(),
            list_unsubscribe: false,
            flagged: false,
            deleted: false,
            headerless: false,
        }
    }

    fn unsubscribable(mut self) -> Self {
        self.list_unsubscribe = true;
        self
    }

    fn flagged(mut self) -> Self {
        self.flagged = true;
        self
    }

    fn headerless(mut self) -> Self {
        self.headerless = true;
        self
    }

    fn matches(&self, criteria: &SearchCriteria) -> bool {
        match criteria {
            SearchCriteria::All | SearchCriteria::Before(_) => true,
            SearchCriteria::Since(_) => false,
            SearchCriteria::Flagged => self.flagged,
            SearchCriteria::Deleted => self.deleted,
            SearchCriteria::Subject(word) => self
                .subject
                .to_lowercase()
                .contains(&word.to_lowercase()),
            SearchCriteria::From(word) => self
                .from
                .as_deref()
                .is_some_and(|from| from.to_lowercase().contains(&word.to_lowercase())),
            SearchCriteria::Header(name, _) => {
                name.eq_ignore_ascii_case("List-Unsubscribe") && self.list_unsubscribe
            }
            SearchCriteria::Uid(set) => Uid::new(self.uid).is_some_and(|uid| set.contains(uid)),
            SearchCriteria::And(keys) => keys.iter().all(|key| self.matches(key)),
            SearchCriteria::Or(a, b) => self.matches(a) || self.matches(b),
            SearchCriteria::Not(inner) => !self.matches(inner),
        }
    }

    fn header_block(&self) -> Vec<u8> {
        let mut block = String::new();
        if let Some(from) = &self.from {
            block.push_str(&format!("From: {from}\r\n"));
        }
        block.push_str(&format!("Subject: {}\r\n\r\n", self.subject));
        block.into_bytes()
    }
}

#[derive(Debug, Default)]
struct Server {
    folders: HashMap<String, Vec<Message>>,
    supports_move: bool,
    supports_uidplus: bool,
    /// Mutating commands, in order.
    writes: Vec<String>,
    /// Writable SELECTs issued.
    selects: usize,
    /// Searches that fail with a timeout before one succeeds.
    search_faults: u32,
    /// Searches the server rejects with NO.
    search_refusals: u32,
    searches: u32,
    /// EXAMINEs that time out before one succeeds.
    examine_faults: u32,
    examines: u32,
    /// A header fetch for this UID panics.
    crash_on_fetch: Option<u32>,
}

type Shared = Arc<Mutex<Server>>;

fn imap_no(text: &str) -> mailsweep_imap::Error {
    mailsweep_imap::Error::No(text.to_string())
}

struct MockSession {
    server: Shared,
    selected: Option<(String, bool)>,
}

impl MockSession {
    fn writable_folder(&self) -> mailsweep_imap::Result<String> {
        match &self.selected {
            Some((folder, false)) => Ok(folder.clone()),
            _ => Err(mailsweep_imap::Error::InvalidState(
                "folder not open read-write".into(),
            )),
        }
    }

    fn server(&self) -> std::sync::MutexGuard<'_, Server> {
        self.server.lock().unwrap()
    }
}

#[async_trait]
impl MailSession for MockSession {
    fn is_healthy(&self) -> bool {
        true
    }

    fn supports_move(&self) -> bool {
        self.server().supports_move
    }

    fn supports_uidplus(&self) -> bool {
        self.server().supports_uidplus
    }

    async fn list_folders(&mut self) -> mailsweep_imap::Result<Vec<String>> {
        Ok(self.server().folders.keys().cloned().collect())
    }

    async fn create_folder(&mut self, name: &str) -> mailsweep_imap::Result<()> {
        let mut server = self.server();
        server.writes.push(format!("CREATE {name}"));
        server.folders.entry(name.to_string()).or_default();
        Ok(())
    }

    async fn examine(&mut self, folder: &str) -> mailsweep_imap::Result<()> {
        let mut server = self.server();
        server.examines += 1;
        if server.examine_faults > 0 {
            server.examine_faults -= 1;
            drop(server);
            self.selected = None;
            return Err(mailsweep_imap::Error::Timeout(Duration::from_secs(30)));
        }
        if !server.folders.contains_key(folder) {
            return Err(imap_no("no such folder"));
        }
        drop(server);
        self.selected = Some((folder.to_string(), true));
        Ok(())
    }

    async fn select(&mut self, folder: &str) -> mailsweep_imap::Result<()> {
        let mut server = self.server();
        if !server.folders.contains_key(folder) {
            return Err(imap_no("no such folder"));
        }
        server.selects += 1;
        drop(server);
        self.selected = Some((folder.to_string(), false));
        Ok(())
    }

    async fn uid_search(&mut self, criteria: &SearchCriteria) -> mailsweep_imap::Result<Vec<Uid>> {
        let Some((folder, _)) = self.selected.clone() else {
            return Err(mailsweep_imap::Error::InvalidState("nothing selected".into()));
        };
        let mut server = self.server();
        server.searches += 1;
        if server.search_faults > 0 {
            server.search_faults -= 1;
            return Err(mailsweep_imap::Error::Timeout(Duration::from_secs(30)));
        }
        if server.search_refusals > 0 {
            server.search_refusals -= 1;
            return Err(imap_no("search refused"));
        }
        Ok(server.folders[&folder]
            .iter()
            .filter(|m| !m.deleted && m.matches(criteria))
            .filter_map(|m| Uid::new(m.uid))
            .collect())
    }

    async fn fetch_header_block(
        &mut self,
        uid: Uid,
        _fields: &[&str],
    ) -> mailsweep_imap::Result<Option<Vec<u8>>> {
        let Some((folder, _)) = self.selected.clone() else {
            return Err(mailsweep_imap::Error::InvalidState("nothing selected".into()));
        };
        let crash = self.server().crash_on_fetch == Some(uid.get());
        if crash {
            panic!("header fetch for UID {} crashed", uid.get());
        }
        Ok(self.server().folders[&folder]
            .iter()
            .find(|m| m.uid == uid.get())
            .filter(|m| !m.headerless)
            .map(Message::header_block))
    }

    async fn uid_move(&mut self, uid: Uid, target: &str) -> mailsweep_imap::Result<()> {
        let folder = self.writable_folder()?;
        let mut server = self.server();
        if !server.supports_move {
            return Err(mailsweep_imap::Error::InvalidState("no MOVE".into()));
        }
        server.writes.push(format!("MOVE {} {target}", uid.get()));
        transfer(&mut server, &folder, uid.get(), target, true)
    }

    async fn uid_copy(&mut self, uid: Uid, target: &str) -> mailsweep_imap::Result<()> {
        let folder = self.writable_folder()?;
        let mut server = self.server();
        server.writes.push(format!("COPY {} {target}", uid.get()));
        transfer(&mut server, &folder, uid.get(), target, false)
    }

    async fn uid_store(&mut self, uid: Uid, action: StoreAction) -> mailsweep_imap::Result<()> {
        let folder = self.writable_folder()?;
        let mut server = self.server();
        server.writes.push(format!("STORE {}", uid.get()));
        if action == StoreAction::AddFlags(vec![Flag::Deleted])
            && let Some(message) = server
                .folders
                .get_mut(&folder)
                .and_then(|messages| messages.iter_mut().find(|m| m.uid == uid.get()))
        {
            message.deleted = true;
        }
        Ok(())
    }

    async fn uid_expunge(&mut self, uid: Uid) -> mailsweep_imap::Result<()> {
        let folder = self.writable_folder()?;
        let mut server = self.server();
        server.writes.push(format!("UID EXPUNGE {}", uid.get()));
        if let Some(messages) = server.folders.get_mut(&folder) {
            messages.retain(|m| !(m.deleted && m.uid == uid.get()));
        }
        Ok(())
    }

    async fn expunge(&mut self) -> mailsweep_imap::Result<()> {
        let folder = self.writable_folder()?;
        let mut server = self.server();
        server.writes.push("EXPUNGE".to_string());
        if let Some(messages) = server.folders.get_mut(&folder) {
            messages.retain(|m| !m.deleted);
        }
        Ok(())
    }

    async fn logout(&mut self) -> mailsweep_imap::Result<()> {
        Ok(())
    }
}

fn transfer(
    server: &mut Server,
    folder: &str,
    uid: u32,
    target: &str,
    remove: bool,
) -> mailsweep_imap::Result<()> {
    if !server.folders.contains_key(target) {
        return Err(imap_no("[TRYCREATE] no such folder"));
    }
    let messages = server
        .folders
        .get_mut(folder)
        .ok_or_else(|| imap_no("no such folder"))?;
    let index = messages
        .iter()
        .position(|m| m.uid == uid)
        .ok_or_else(|| imap_no("no such message"))?;
    let message = if remove {
        messages.remove(index)
    } else {
        messages[index].clone()
    };
    server
        .folders
        .get_mut(target)
        .ok_or_else(|| imap_no("no such folder"))?
        .push(message);
    Ok(())
}

struct MockConnector {
    server: Shared,
    /// Connections allowed before every further attempt is refused.
    allowed: usize,
    opened: AtomicUsize,
}

impl MockConnector {
    fn new(server: &Shared) -> Self {
        Self {
            server: Arc::clone(server),
            allowed: usize::MAX,
            opened: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Connector for MockConnector {
    type Session = MockSession;

    async fn connect(&self) -> mailsweep_imap::Result<MockSession> {
        if self.opened.fetch_add(1, Ordering::SeqCst) >= self.allowed {
            return Err(mailsweep_imap::Error::ConnectionLost("refused".into()));
        }
        Ok(MockSession {
            server: Arc::clone(&self.server),
            selected: None,
        })
    }
}

#[derive(Default)]
struct Recorder {
    emails: Mutex<Vec<(EmailAction, u32, String)>>,
    folders: Mutex<Vec<(String, usize, usize)>>,
    completed: Mutex<Option<(usize, usize)>>,
    errors: Mutex<Vec<String>>,
}

impl ProgressReporter for Recorder {
    fn on_email_processed(
        &self,
        action: EmailAction,
        uid: Uid,
        _sender: &str,
        _subject: &str,
        reason: &str,
    ) {
        self.emails
            .lock()
            .unwrap()
            .push((action, uid.get(), reason.to_string()));
    }

    fn on_folder_complete(&self, folder: &str, candidates: usize, moved: usize) {
        self.folders
            .lock()
            .unwrap()
            .push((folder.to_string(), candidates, moved));
    }

    fn on_complete(&self, candidates: usize, moved: usize) {
        *self.completed.lock().unwrap() = Some((candidates, moved));
    }

    fn on_error(&self, _error: &str, details: &str) {
        self.errors.lock().unwrap().push(details.to_string());
    }
}

const TARGET: &str = "Review/Delete";

/// Message 1 has List-Unsubscribe, message 2 a trigger subject, message 3
/// a deletion-listed sender, message 4 is flagged and never a candidate.
fn scenario_server() -> Shared {
    let inbox = vec![
        Message::new(1, "Shop <news@shop.example>", "Hello there").unsubscribable(),
        Message::new(2, "Alice <alice@blog.example>", "Monthly newsletter"),
        Message::new(3, "promo@spam.example", "Greetings"),
        Message::new(4, "Bob <bob@friends.example>", "newsletter draft").flagged(),
    ];
    let mut folders = HashMap::new();
    folders.insert("INBOX".to_string(), inbox);
    Arc::new(Mutex::new(Server {
        folders,
        supports_move: true,
        supports_uidplus: true,
        ..Server::default()
    }))
}

fn settings(dry_run: bool) -> RunSettings {
    RunSettings {
        source_folders: vec!["INBOX".to_string()],
        target_folder: TARGET.to_string(),
        age_days: 365,
        dry_run,
        search_max_attempts: 3,
        max_search_keywords: 10,
        batch_size: 2,
        max_workers: 2,
        header_fetch_workers: 2,
        cpu_count: 4,
        subject_keywords: vec!["newsletter".to_string()],
        delete_domains: vec!["spam.example".to_string()],
    }
}

fn rules(whitelist: &[&str], protect: &[&str]) -> Rules {
    Rules::new(
        whitelist.iter().map(ToString::to_string).collect(),
        protect.iter().map(ToString::to_string).collect(),
        vec!["newsletter".to_string()],
        vec!["spam.example".to_string()],
    )
}

fn orchestrator(
    server: &Shared,
    dry_run: bool,
    rules: Rules,
) -> (Orchestrator<MockConnector>, Arc<Recorder>) {
    let recorder = Arc::new(Recorder::default());
    let orchestrator =
        Orchestrator::with_settings(MockConnector::new(server), settings(dry_run), rules)
            .with_reporter(Arc::clone(&recorder) as Arc<dyn ProgressReporter>);
    (orchestrator, recorder)
}

fn uids_in(server: &Shared, folder: &str) -> Vec<u32> {
    let server = server.lock().unwrap();
    let mut uids: Vec<u32> = server.folders[folder].iter().map(|m| m.uid).collect();
    uids.sort_unstable();
    uids
}

#[tokio::test]
async fn test_moves_every_match() {
    let server = scenario_server();
    let (orchestrator, recorder) = orchestrator(&server, false, rules(&[], &[]));

    let totals = orchestrator.run().await.unwrap();
    assert_eq!(
        totals,
        Totals {
            candidates: 3,
            moved: 3
        }
    );

    assert_eq!(uids_in(&server, TARGET), vec![1, 2, 3]);
    assert_eq!(uids_in(&server, "INBOX"), vec![4]);
    assert_eq!(*recorder.completed.lock().unwrap(), Some((3, 3)));
    assert_eq!(
        *recorder.folders.lock().unwrap(),
        vec![("INBOX".to_string(), 3, 3)]
    );

    let mut reasons: Vec<(u32, String)> = recorder
        .emails
        .lock()
        .unwrap()
        .iter()
        .filter(|(action, _, _)| *action == EmailAction::Moved)
        .map(|(_, uid, reason)| (*uid, reason.clone()))
        .collect();
    reasons.sort();
    assert_eq!(
        reasons,
        vec![
            (1, "List-Unsubscribe header".to_string()),
            (2, "subject keyword 'newsletter'".to_string()),
            (3, "delete domain 'spam.example'".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_whitelisted_sender_is_skipped() {
    let server = scenario_server();
    let (orchestrator, recorder) =
        orchestrator(&server, false, rules(&["alice@blog.example"], &[]));

    let totals = orchestrator.run().await.unwrap();
    assert_eq!(
        totals,
        Totals {
            candidates: 2,
            moved: 2
        }
    );
    assert_eq!(uids_in(&server, "INBOX"), vec![2, 4]);

    let emails = recorder.emails.lock().unwrap();
    assert!(emails.contains(&(EmailAction::Skip, 2, "whitelist".to_string())));
}

#[tokio::test]
async fn test_protect_keyword_beats_trigger() {
    let server = scenario_server();
    server.lock().unwrap().folders.get_mut("INBOX").unwrap()[1].subject =
        "Newsletter with your invoice".to_string();
    let (orchestrator, recorder) = orchestrator(&server, false, rules(&[], &["invoice"]));

    let totals = orchestrator.run().await.unwrap();
    assert_eq!(
        totals,
        Totals {
            candidates: 2,
            moved: 2
        }
    );
    assert!(uids_in(&server, "INBOX").contains(&2));
    assert!(!uids_in(&server, TARGET).contains(&2));

    let emails = recorder.emails.lock().unwrap();
    assert!(emails.contains(&(EmailAction::Skip, 2, "protected subject".to_string())));
    assert!(
        !emails
            .iter()
            .any(|(action, uid, _)| *uid == 2 && *action != EmailAction::Skip)
    );
}

#[tokio::test]
async fn test_dry_run_changes_nothing() {
    let server = scenario_server();
    let (orchestrator, recorder) = orchestrator(&server, true, rules(&[], &[]));

    let totals = orchestrator.run().await.unwrap();
    assert_eq!(
        totals,
        Totals {
            candidates: 3,
            moved: 3
        }
    );

    let state = server.lock().unwrap();
    assert!(state.writes.is_empty(), "writes: {:?}", state.writes);
    assert_eq!(state.selects, 0);
    assert!(!state.folders.contains_key(TARGET));
    assert_eq!(state.folders["INBOX"].len(), 4);
    drop(state);

    let would_move = recorder
        .emails
        .lock()
        .unwrap()
        .iter()
        .filter(|(action, _, _)| *action == EmailAction::DryRun)
        .count();
    assert_eq!(would_move, 3);
}

#[tokio::test]
async fn test_creates_target_folder_once() {
    let server = scenario_server();
    let (orchestrator, _) = orchestrator(&server, false, rules(&[], &[]));
    orchestrator.run().await.unwrap();

    let creates = server
        .lock()
        .unwrap()
        .writes
        .iter()
        .filter(|w| w.starts_with("CREATE"))
        .count();
    assert_eq!(creates, 1);
}

#[tokio::test]
async fn test_copy_fallback_without_move() {
    let server = scenario_server();
    server.lock().unwrap().supports_move = false;
    let (orchestrator, _) = orchestrator(&server, false, rules(&[], &[]));

    let totals = orchestrator.run().await.unwrap();
    assert_eq!(totals.moved, 3);
    assert_eq!(uids_in(&server, TARGET), vec![1, 2, 3]);
    assert_eq!(uids_in(&server, "INBOX"), vec![4]);

    let state = server.lock().unwrap();
    assert!(state.writes.iter().all(|w| !w.starts_with("MOVE")));
    assert_eq!(
        state
            .writes
            .iter()
            .filter(|w| w.starts_with("UID EXPUNGE"))
            .count(),
        3
    );
}

#[tokio::test]
async fn test_missing_folder_contributes_nothing() {
    let server = scenario_server();
    let mut run = settings(false);
    run.source_folders = vec!["Missing".to_string(), "INBOX".to_string()];
    let orchestrator =
        Orchestrator::with_settings(MockConnector::new(&server), run, rules(&[], &[]));

    let totals = orchestrator.run().await.unwrap();
    assert_eq!(
        totals,
        Totals {
            candidates: 3,
            moved: 3
        }
    );
}

#[tokio::test]
async fn test_cancelled_run_skips_folders() {
    let server = scenario_server();
    let (orchestrator, recorder) = orchestrator(&server, false, rules(&[], &[]));
    orchestrator.cancellation_token().cancel();

    let totals = orchestrator.run().await.unwrap();
    assert_eq!(totals, Totals::default());
    assert_eq!(uids_in(&server, "INBOX"), vec![1, 2, 3, 4]);
    assert_eq!(*recorder.completed.lock().unwrap(), Some((0, 0)));
}

#[tokio::test]
async fn test_acquisition_failure_aborts_run() {
    let server = scenario_server();
    let recorder = Arc::new(Recorder::default());
    let connector = MockConnector {
        allowed: 1,
        ..MockConnector::new(&server)
    };
    let orchestrator = Orchestrator::with_settings(connector, settings(false), rules(&[], &[]))
        .with_reporter(Arc::clone(&recorder) as Arc<dyn ProgressReporter>);

    let err = orchestrator.run().await.unwrap_err();
    assert!(matches!(err, Error::SessionAcquisition(_)));
    assert_eq!(recorder.errors.lock().unwrap().len(), 1);
    assert_eq!(*recorder.completed.lock().unwrap(), None);
    assert_eq!(uids_in(&server, "INBOX"), vec![1, 2, 3, 4]);
}

#[tokio::test]
async fn test_search_retries_network_faults() {
    let server = scenario_server();
    server.lock().unwrap().search_faults = 2;
    let mut session = MockConnector::new(&server).connect().await.unwrap();

    let found = search_uids(&mut session, "INBOX", &SearchCriteria::All, 3).await;
    assert_eq!(found.len(), 4);
    assert_eq!(server.lock().unwrap().searches, 3);
}

#[tokio::test]
async fn test_search_gives_up_after_max_attempts() {
    let server = scenario_server();
    server.lock().unwrap().search_faults = 3;
    let mut session = MockConnector::new(&server).connect().await.unwrap();

    let found = search_uids(&mut session, "INBOX", &SearchCriteria::All, 3).await;
    assert!(found.is_empty());
    assert_eq!(server.lock().unwrap().searches, 3);
}

#[tokio::test]
async fn test_move_into_missing_folder_fails() {
    let server = scenario_server();
    let mut session = MockConnector::new(&server).connect().await.unwrap();
    session.select("INBOX").await.unwrap();

    assert!(!move_message(&mut session, Uid::new(1).unwrap(), "Nowhere").await);
    assert_eq!(uids_in(&server, "INBOX"), vec![1, 2, 3, 4]);
}

#[tokio::test]
async fn test_network_fault_opening_folder_is_retried() {
    let server = scenario_server();
    server.lock().unwrap().examine_faults = 1;
    let (orchestrator, _) = orchestrator(&server, false, rules(&[], &[]));

    let totals = orchestrator.run().await.unwrap();
    assert_eq!(
        totals,
        Totals {
            candidates: 3,
            moved: 3
        }
    );
    assert_eq!(uids_in(&server, TARGET), vec![1, 2, 3]);
}

#[tokio::test]
async fn test_folder_opened_once_for_many_searches() {
    let server = scenario_server();
    let mut session = MockConnector::new(&server).connect().await.unwrap();
    let queries = [
        SearchCriteria::All,
        SearchCriteria::Flagged,
        SearchCriteria::Subject("newsletter".into()),
    ];

    let found = union_searches(&mut session, "INBOX", &queries, 3).await;
    assert_eq!(found.len(), 4);
    let state = server.lock().unwrap();
    assert_eq!(state.examines, 1);
    assert_eq!(state.searches, 3);
}

#[tokio::test]
async fn test_folder_reopened_after_search_fault() {
    let server = scenario_server();
    server.lock().unwrap().search_faults = 1;
    let mut session = MockConnector::new(&server).connect().await.unwrap();
    let queries = [
        SearchCriteria::Flagged,
        SearchCriteria::Subject("newsletter".into()),
    ];

    let found = union_searches(&mut session, "INBOX", &queries, 3).await;
    let found: Vec<u32> = found.iter().map(|uid| uid.get()).collect();
    assert_eq!(found, vec![2, 4]);
    let state = server.lock().unwrap();
    assert_eq!(state.examines, 2);
    assert_eq!(state.searches, 3);
}

#[tokio::test]
async fn test_refused_search_is_not_retried() {
    let server = scenario_server();
    server.lock().unwrap().search_refusals = 1;
    let mut session = MockConnector::new(&server).connect().await.unwrap();

    let found = search_uids(&mut session, "INBOX", &SearchCriteria::All, 3).await;
    assert!(found.is_empty());
    assert_eq!(server.lock().unwrap().searches, 1);
}

#[tokio::test]
async fn test_crashed_batch_spares_siblings_and_later_folders() {
    let server = scenario_server();
    {
        let mut state = server.lock().unwrap();
        state.crash_on_fetch = Some(3);
        state.folders.insert(
            "Archive".to_string(),
            vec![Message::new(7, "deals@spam.example", "Weekly deals")],
        );
    }
    let recorder = Arc::new(Recorder::default());
    let mut run = settings(false);
    run.source_folders = vec!["INBOX".to_string(), "Archive".to_string()];
    let orchestrator =
        Orchestrator::with_settings(MockConnector::new(&server), run, rules(&[], &[]))
            .with_reporter(Arc::clone(&recorder) as Arc<dyn ProgressReporter>);

    let totals = orchestrator.run().await.unwrap();
    assert_eq!(
        totals,
        Totals {
            candidates: 3,
            moved: 3
        }
    );
    assert_eq!(
        *recorder.folders.lock().unwrap(),
        vec![("INBOX".to_string(), 2, 2), ("Archive".to_string(), 1, 1)]
    );
    assert_eq!(uids_in(&server, "INBOX"), vec![3, 4]);
    assert_eq!(uids_in(&server, TARGET), vec![1, 2, 7]);
}

#[tokio::test]
async fn test_message_without_headers_is_excluded() {
    let server = scenario_server();
    {
        let mut state = server.lock().unwrap();
        let inbox = state.folders.get_mut("INBOX").unwrap();
        inbox[2] = inbox[2].clone().headerless();
    }
    let (orchestrator, recorder) = orchestrator(&server, false, rules(&[], &[]));

    let totals = orchestrator.run().await.unwrap();
    assert_eq!(
        totals,
        Totals {
            candidates: 2,
            moved: 2
        }
    );
    assert_eq!(uids_in(&server, "INBOX"), vec![3, 4]);
    assert!(
        !recorder
            .emails
            .lock()
            .unwrap()
            .iter()
            .any(|(_, uid, _)| *uid == 3)
    );
}
