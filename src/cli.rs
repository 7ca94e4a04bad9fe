use crate::{
    activity::ActivityLog,
    api::{ApiError, HttpClient, Request, Response},
    config::Config,
    models::{Role, SortBy, SortOrder, User},
    query::QueryAction,
    router::Route,
    session::{Denial, Session},
    views::{
        self,
        dashboard::DashboardView,
        login::LoginView,
        profile::ProfileView,
        register::{RegisterView, REGISTERED},
        Outcome,
    },
    Args,
};
use anyhow::Result;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::cell::RefCell;
use std::time::Instant;

const MAX_REDIRECTS: usize = 4;

pub struct Context {
    pub args: Args,
    pub config: Config,
    pub http: Box<dyn HttpClient>,
    pub session: RefCell<Session>,
    pub activity: RefCell<ActivityLog>,
    pub session_id: String,
}

fn verbose(ctx: &Context, message: &str) {
    if ctx.args.verbose || ctx.args.debug {
        eprintln!("[INFO] {}", message);
    }
}

fn debug(ctx: &Context, message: &str) {
    if ctx.args.debug {
        eprintln!("[DEBUG] {}", message);
    }
}

/// Transport wrapper that records every call in the activity log
struct Recorder<'a> {
    ctx: &'a Context,
}

impl HttpClient for Recorder<'_> {
    fn send(&self, request: &Request) -> Result<Response, ApiError> {
        let method = request.method.as_str();
        debug(
            self.ctx,
            &format!("{} {} {:?}", method, request.path, request.query),
        );

        let start = Instant::now();
        let result = self.ctx.http.send(request);
        let duration_ms = start.elapsed().as_millis() as u64;

        let (status, error) = match &result {
            Ok(resp) => (Some(resp.status), None),
            Err(e) => (None, Some(e.to_string())),
        };
        debug(
            self.ctx,
            &format!(
                "-> {:?} in {}ms {}",
                status,
                duration_ms,
                error.as_deref().unwrap_or("")
            ),
        );
        let _ = self.ctx.activity.borrow_mut().api_call(
            method,
            &request.path,
            status,
            duration_ms,
            error.as_deref(),
        );
        result
    }
}

enum Screen {
    Login(LoginView),
    Register(RegisterView),
    Dashboard(DashboardView),
    Profile(ProfileView),
}

/// The running console: current route plus that route's view state
pub struct Console<'a> {
    ctx: &'a Context,
    route: Option<Route>,
    screen: Screen,
}

impl<'a> Console<'a> {
    pub fn new(ctx: &'a Context) -> Self {
        Self {
            ctx,
            route: None,
            screen: Screen::Login(LoginView::new()),
        }
    }

    fn http(&self) -> Recorder<'a> {
        Recorder { ctx: self.ctx }
    }

    fn current(&self) -> Route {
        self.route.unwrap_or(Route::Login)
    }

    /// Mount `to`, following redirects issued by view mounts
    pub fn navigate(&mut self, to: Route) {
        let settled = follow_redirects(to, |target| {
            let from = self.route.map(|r| r.path());
            let _ = self.ctx.activity.borrow_mut().navigate(from, target.path());
            verbose(
                self.ctx,
                &format!("navigate {} -> {}", from.unwrap_or("-"), target),
            );

            let outcome = self.mount(target);
            self.route = Some(target);
            outcome
        });
        if let Err(last) = settled {
            eprintln!("Error: too many redirects, staying on {}", last);
        }
        self.render();
    }

    fn mount(&mut self, route: Route) -> Outcome {
        let http = self.http();
        let session = self.ctx.session.borrow();
        match route {
            Route::Login => {
                let view = LoginView::new();
                let outcome = view.on_mount(&session);
                if let Outcome::Navigate(to) = outcome {
                    self.log_redirect(route, to, "already logged in");
                }
                self.screen = Screen::Login(view);
                outcome
            }
            Route::Register => {
                self.screen = Screen::Register(RegisterView::new());
                Outcome::Stay
            }
            Route::Dashboard => {
                let mut view = DashboardView::new(self.ctx.config.initial_query());
                let outcome = match view.on_mount(&http, &session) {
                    Ok(outcome) => outcome,
                    Err(denial) => {
                        self.log_denial(route, &denial);
                        Outcome::from(denial)
                    }
                };
                self.screen = Screen::Dashboard(view);
                outcome
            }
            Route::Profile => {
                let mut view = ProfileView::new();
                let outcome = view.on_mount(&http, &session);
                if let Outcome::Navigate(to) = outcome {
                    self.log_redirect(route, to, "no valid session");
                }
                self.screen = Screen::Profile(view);
                outcome
            }
        }
    }

    fn log_redirect(&self, from: Route, to: Route, reason: &str) {
        verbose(
            self.ctx,
            &format!("redirect {} -> {}: {}", from, to, reason),
        );
        let _ = self
            .ctx
            .activity
            .borrow_mut()
            .redirect(from.path(), to.path(), reason);
    }

    fn log_denial(&self, from: Route, denial: &Denial) {
        if !matches!(denial, Denial::NoToken) {
            println!("Access denied: {}", denial);
        }
        self.log_redirect(from, Route::Login, &denial.to_string());
    }

    fn apply(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Stay => self.render(),
            Outcome::Navigate(to) => self.navigate(to),
        }
    }

    pub fn render(&mut self) {
        let route = self.current();
        println!();
        println!("== {} ({}) ==", route.title(), route);
        match &mut self.screen {
            Screen::Login(view) => {
                print_messages(self.ctx, route, &mut view.error, &mut None);
                println!("/login [email] to sign in, /register to create an account");
            }
            Screen::Register(view) => {
                print_messages(self.ctx, route, &mut view.error, &mut None);
                println!("/register to fill in the form, /go / to sign in instead");
            }
            Screen::Dashboard(view) => {
                render_dashboard(view);
                print_messages(self.ctx, route, &mut view.error, &mut view.notice);
            }
            Screen::Profile(view) => {
                match &view.user {
                    Some(user) => render_profile(user),
                    None => println!("Loading profile..."),
                }
                print_messages(self.ctx, route, &mut view.error, &mut view.notice);
                println!("/edit to change name or password, /logout to leave");
            }
        }
    }

    /// Handle one console line. Returns true when the console should exit.
    pub fn handle_command(&mut self, rl: &mut DefaultEditor, line: &str) -> bool {
        let words = match shell_words::split(line) {
            Ok(words) => words,
            Err(e) => {
                println!("Invalid arguments: {}", e);
                return false;
            }
        };
        let Some((cmd, args)) = words.split_first() else {
            return false;
        };
        let args: Vec<&str> = args.iter().map(String::as_str).collect();

        match cmd.as_str() {
            "/exit" | "/quit" => return true,
            "/help" => print_help(),
            "/go" => match args.first().and_then(|p| Route::parse(p)) {
                Some(route) => self.navigate(route),
                None => println!(
                    "Unknown route. Available: {}",
                    Route::ALL.map(|r| r.path()).join(", ")
                ),
            },
            "/whoami" => self.whoami(),
            "/logout" => self.logout(),
            _ => self.handle_view_command(rl, cmd, &args),
        }
        false
    }

    fn handle_view_command(&mut self, rl: &mut DefaultEditor, cmd: &str, args: &[&str]) {
        match (self.current(), cmd) {
            (Route::Login, "/login") => self.login(rl, args.first().copied()),
            (Route::Login, "/register") => self.navigate(Route::Register),
            (Route::Register, "/register") => self.register(rl),
            (Route::Dashboard, _) => self.dashboard_command(rl, cmd, args),
            (Route::Profile, "/show") => {
                let outcome = self
                    .with_profile(|view, http, session| view.fetch_user(http, session))
                    .unwrap_or(Outcome::Stay);
                self.apply(outcome);
            }
            (Route::Profile, "/edit") => self.edit_profile(rl),
            _ => println!(
                "Unknown command {} on {}. Type /help for commands.",
                cmd,
                self.current()
            ),
        }
    }

    fn whoami(&self) {
        let session = self.ctx.session.borrow();
        match session.claims() {
            None => println!("Not logged in."),
            Some(Err(e)) => println!("Stored session token is invalid: {}", e),
            Some(Ok(claims)) => {
                let sub = claims.sub.as_deref().unwrap_or("(no subject)");
                println!("User {} ({})", sub, claims.role);
                if let Some(exp) = claims.expires_at_utc() {
                    let suffix = if claims.is_expired(chrono::Utc::now()) {
                        " [expired]"
                    } else {
                        ""
                    };
                    println!(
                        "Token expires at {}{}",
                        exp.format("%Y-%m-%d %H:%M UTC"),
                        suffix
                    );
                }
            }
        }
        println!("Session file: {}", session.store().path().display());
    }

    fn logout(&mut self) {
        let result = views::logout(&mut self.ctx.session.borrow_mut());
        match result {
            Ok(outcome) => {
                let _ = self.ctx.activity.borrow_mut().logout();
                println!("Logged out.");
                self.apply(outcome);
            }
            Err(e) => eprintln!("Error: {:#}", e),
        }
    }

    fn login(&mut self, rl: &mut DefaultEditor, email: Option<&str>) {
        let email = match email {
            Some(e) => e.to_string(),
            None => match prompt(rl, "Email") {
                Some(e) => e,
                None => return,
            },
        };
        let Some(password) = prompt(rl, "Password") else {
            return;
        };

        let http = self.http();
        let Screen::Login(view) = &mut self.screen else {
            return;
        };
        view.email = email;
        view.password = password;

        let result = view.submit(&http, &mut self.ctx.session.borrow_mut());
        let ok = view.error.is_none();
        let _ = self.ctx.activity.borrow_mut().login(view.email.trim(), ok);
        match result {
            Ok(outcome) => self.apply(outcome),
            Err(e) => eprintln!("Error: {:#}", e),
        }
    }

    fn register(&mut self, rl: &mut DefaultEditor) {
        let mut fields = Vec::with_capacity(4);
        for label in ["Name", "Email", "Password (at least 8 characters)", "Confirm password"] {
            match prompt(rl, label) {
                Some(value) => fields.push(value),
                None => return,
            }
        }

        let http = self.http();
        let Screen::Register(view) = &mut self.screen else {
            return;
        };
        view.form.confirm_password = fields.pop().unwrap_or_default();
        view.form.password = fields.pop().unwrap_or_default();
        view.form.email = fields.pop().unwrap_or_default();
        view.form.name = fields.pop().unwrap_or_default();

        let outcome = view.submit(&http);
        if view.success {
            println!("{}", REGISTERED);
        }
        self.apply(outcome);
    }

    fn with_profile<T>(
        &mut self,
        f: impl FnOnce(&mut ProfileView, &dyn HttpClient, &Session) -> T,
    ) -> Option<T> {
        let recorder = self.http();
        let session = self.ctx.session.borrow();
        match &mut self.screen {
            Screen::Profile(view) => Some(f(view, &recorder as &dyn HttpClient, &session)),
            _ => None,
        }
    }

    fn edit_profile(&mut self, rl: &mut DefaultEditor) {
        self.with_profile(|view, _, _| view.start_edit());
        let name = prompt(rl, "New name (blank to keep)");
        let password = name
            .as_ref()
            .and_then(|_| prompt(rl, "New password (blank to keep)"));
        let (Some(name), Some(password)) = (name, password) else {
            self.with_profile(|view, _, _| view.cancel_edit());
            return;
        };

        let outcome = self
            .with_profile(|view, http, session| {
                view.form.name = name;
                view.form.password = password;
                let outcome = view.submit(http, session);
                // Leave edit mode; the error stays visible
                view.editing = false;
                outcome
            })
            .unwrap_or(Outcome::Stay);
        self.apply(outcome);
    }

    fn dashboard_command(&mut self, rl: &mut DefaultEditor, cmd: &str, args: &[&str]) {
        let http = self.http();
        let Screen::Dashboard(view) = &mut self.screen else {
            return;
        };

        match cmd {
            "/list" => {
                let session = self.ctx.session.borrow();
                view.refresh(&http, &session);
            }
            "/filter" => {
                let role = match args.first().copied() {
                    Some("all") | Some("ALL") | None => None,
                    Some(value) => match Role::parse_loose(value) {
                        Some(role) => Some(role),
                        None => {
                            println!("Usage: /filter <ADMIN|USER|all>");
                            return;
                        }
                    },
                };
                let session = self.ctx.session.borrow();
                view.control(&http, &session, QueryAction::FilterRole(role));
            }
            "/sort" => {
                let Some(sort_by) = args.first().and_then(|s| SortBy::parse(s)) else {
                    println!("Usage: /sort <name|createdAt> [asc|desc]");
                    return;
                };
                let order = match args.get(1) {
                    Some(s) => match SortOrder::parse(s) {
                        Some(order) => Some(order),
                        None => {
                            println!("Usage: /sort <name|createdAt> [asc|desc]");
                            return;
                        }
                    },
                    None => None,
                };
                let meta = view.meta.clone();
                let mut changed = view.query.apply(QueryAction::SortBy(sort_by), meta.as_ref());
                if let Some(order) = order {
                    changed |= view.query.apply(QueryAction::SortOrder(order), meta.as_ref());
                }
                if changed {
                    let session = self.ctx.session.borrow();
                    view.refresh(&http, &session);
                }
            }
            "/order" => {
                let Some(order) = args.first().and_then(|s| SortOrder::parse(s)) else {
                    println!("Usage: /order <asc|desc>");
                    return;
                };
                let session = self.ctx.session.borrow();
                view.control(&http, &session, QueryAction::SortOrder(order));
            }
            "/page" => {
                let action = match args.first().copied() {
                    Some("next") => QueryAction::NextPage,
                    Some("prev") => QueryAction::PrevPage,
                    Some(n) => match n.parse::<u32>() {
                        Ok(n) => QueryAction::GoTo(n),
                        Err(_) => {
                            println!("Usage: /page <next|prev|N>");
                            return;
                        }
                    },
                    None => {
                        println!("Usage: /page <next|prev|N>");
                        return;
                    }
                };
                let session = self.ctx.session.borrow();
                if !view.control(&http, &session, action) {
                    println!("Already at that page boundary.");
                }
            }
            "/per-page" => match args.first().and_then(|s| s.parse::<u32>().ok()) {
                Some(n) => {
                    let session = self.ctx.session.borrow();
                    view.control(&http, &session, QueryAction::PerPage(n));
                }
                None => {
                    println!("Usage: /per-page <N>");
                    return;
                }
            },
            "/create" => {
                view.open_create();
                let fields = prompt_all(rl, &["Name", "Email", "Password"]);
                let role = fields
                    .as_ref()
                    .and_then(|_| prompt(rl, "Role [USER|ADMIN] (default USER)"));
                let (Some(mut fields), Some(role)) = (fields, role) else {
                    view.cancel_create();
                    return;
                };
                let role = if role.trim().is_empty() {
                    Role::User
                } else {
                    match Role::parse_loose(&role) {
                        Some(role) => role,
                        None => {
                            println!("Unknown role '{}'.", role);
                            view.cancel_create();
                            return;
                        }
                    }
                };
                if let Some(form) = view.creating.as_mut() {
                    form.password = fields.pop().unwrap_or_default();
                    form.email = fields.pop().unwrap_or_default();
                    form.name = fields.pop().unwrap_or_default();
                    form.role = role;
                }
                let session = self.ctx.session.borrow();
                view.submit_create(&http, &session);
                view.cancel_create();
            }
            "/edit" => {
                let Some(id) = args.first() else {
                    println!("Usage: /edit <id>");
                    return;
                };
                {
                    let session = self.ctx.session.borrow();
                    if !view.open_edit(&http, &session, id) {
                        self.render();
                        return;
                    }
                }
                let fields = prompt_all(
                    rl,
                    &[
                        "New name (blank to keep)",
                        "New email (blank to keep)",
                        "New password (blank to keep)",
                    ],
                );
                let Some(mut fields) = fields else {
                    view.cancel_edit();
                    return;
                };
                if let Some(editing) = view.editing.as_mut() {
                    editing.form.password = fields.pop().unwrap_or_default();
                    editing.form.email = fields.pop().unwrap_or_default();
                    editing.form.name = fields.pop().unwrap_or_default();
                }
                let session = self.ctx.session.borrow();
                view.submit_edit(&http, &session);
                view.cancel_edit();
            }
            "/delete" => {
                let Some(id) = args.first() else {
                    println!("Usage: /delete <id>");
                    return;
                };
                let label = view
                    .users
                    .iter()
                    .find(|u| u.id == *id)
                    .map(|u| format!("{} <{}>", u.name, u.email))
                    .unwrap_or_else(|| id.to_string());
                if !self.ctx.args.yes && !confirm(rl, &format!("Delete user {}?", label)) {
                    println!("Cancelled.");
                    return;
                }
                let session = self.ctx.session.borrow();
                view.delete(&http, &session, id);
            }
            _ => {
                println!(
                    "Unknown command {} on {}. Type /help for commands.",
                    cmd,
                    Route::Dashboard
                );
                return;
            }
        }
        self.render();
    }
}

/// Mount `to` and whatever it redirects to, at most `MAX_REDIRECTS` times.
/// Returns the route that settled, or `Err` with the last one mounted.
fn follow_redirects(to: Route, mut mount: impl FnMut(Route) -> Outcome) -> Result<Route, Route> {
    let mut target = to;
    let mut hops = 0;
    loop {
        match mount(target) {
            Outcome::Navigate(next) if next != target => {
                hops += 1;
                if hops == MAX_REDIRECTS {
                    return Err(target);
                }
                target = next;
            }
            _ => return Ok(target),
        }
    }
}

fn print_messages(
    ctx: &Context,
    route: Route,
    error: &mut Option<String>,
    notice: &mut Option<String>,
) {
    if let Some(message) = notice.take() {
        println!("{}", message);
    }
    if let Some(message) = error.take() {
        println!("Error: {}", message);
        let _ = ctx.activity.borrow_mut().view_error(route.path(), &message);
    }
}

fn render_dashboard(view: &DashboardView) {
    let q = &view.query;
    let filter = q.role.map(|r| r.as_str()).unwrap_or("all");
    println!(
        "Filter: {} | Sort: {} {} | Per page: {}",
        filter,
        q.sort_by.as_str(),
        q.sort_order.as_str(),
        q.per_page
    );

    if view.users.is_empty() {
        println!("(no users)");
    } else {
        print!("{}", user_table(&view.users));
    }

    if let Some(meta) = &view.meta {
        println!(
            "Page {}/{} ({} users)  {}  {}",
            meta.page,
            meta.last_page.max(1),
            meta.total,
            if view.can_prev() { "[/page prev]" } else { "[prev disabled]" },
            if view.can_next() { "[/page next]" } else { "[next disabled]" },
        );
    }
}

/// Fixed-width table of users
pub fn user_table(users: &[User]) -> String {
    let headers = ["ID", "Name", "Email", "Role"];
    let rows: Vec<[String; 4]> = users
        .iter()
        .map(|u| {
            [
                u.id.clone(),
                u.name.clone(),
                u.email.clone(),
                u.role.to_string(),
            ]
        })
        .collect();

    let mut widths = headers.map(|h| h.chars().count());
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let line = |cells: [&str; 4]| -> String {
        let padded: Vec<String> = cells
            .iter()
            .zip(widths.iter())
            .map(|(cell, w)| format!("{:<width$}", cell, width = w))
            .collect();
        format!("{}\n", padded.join("  ").trim_end())
    };

    let mut out = line(headers);
    out.push_str(&line(widths.map(|w| "-".repeat(w)).each_ref().map(String::as_str)));
    for row in &rows {
        out.push_str(&line(row.each_ref().map(String::as_str)));
    }
    out
}

fn render_profile(user: &User) {
    println!("Name:       {}", user.name);
    println!("Email:      {}", user.email);
    println!("Role:       {}", user.role);
    println!("Created at: {}", user.created_at.format("%Y-%m-%d"));
}

/// Read one form field. `None` means the user cancelled (Ctrl-C / Ctrl-D).
fn prompt(rl: &mut DefaultEditor, label: &str) -> Option<String> {
    match rl.readline(&format!("{}: ", label)) {
        Ok(value) => Some(value),
        Err(ReadlineError::Interrupted | ReadlineError::Eof) => {
            println!("Cancelled.");
            None
        }
        Err(e) => {
            eprintln!("Input error: {}", e);
            None
        }
    }
}

fn prompt_all(rl: &mut DefaultEditor, labels: &[&str]) -> Option<Vec<String>> {
    labels.iter().map(|label| prompt(rl, label)).collect()
}

fn confirm(rl: &mut DefaultEditor, question: &str) -> bool {
    matches!(
        prompt(rl, &format!("{} [y/N]", question)).as_deref().map(str::trim),
        Some("y") | Some("Y") | Some("yes")
    )
}

fn print_help() {
    println!("Commands:");
    println!("  /exit                   - quit");
    println!("  /help                   - show commands");
    println!("  /go <path>              - open /, /register, /dashboard or /profile");
    println!("  /whoami                 - show the current session");
    println!("  /logout                 - end the session");
    println!("Login (/):");
    println!("  /login [email]          - sign in");
    println!("  /register               - open the registration form");
    println!("Register (/register):");
    println!("  /register               - fill in and submit the form");
    println!("Dashboard (/dashboard, ADMIN only):");
    println!("  /list                   - reload the current page");
    println!("  /filter <ADMIN|USER|all>");
    println!("  /sort <name|createdAt> [asc|desc]");
    println!("  /order <asc|desc>");
    println!("  /page <next|prev|N>");
    println!("  /per-page <N>");
    println!("  /create                 - create a user");
    println!("  /edit <id>              - update a user (blank fields are kept)");
    println!("  /delete <id>            - delete a user");
    println!("Profile (/profile):");
    println!("  /show                   - reload your profile");
    println!("  /edit                   - change your name or password");
}

fn initial_route(ctx: &Context) -> Route {
    match Route::parse(&ctx.args.route) {
        Some(route) => route,
        None => {
            eprintln!("Warning: unknown route '{}', starting at /", ctx.args.route);
            Route::Login
        }
    }
}

pub fn run_once(ctx: &Context, command: &str) -> Result<()> {
    let mut rl = DefaultEditor::new()?;
    let mut console = Console::new(ctx);
    console.navigate(initial_route(ctx));
    console.handle_command(&mut rl, command.trim());
    Ok(())
}

pub fn run_repl(ctx: Context) -> Result<()> {
    let mut rl = DefaultEditor::new()?;
    let mut console = Console::new(&ctx);

    println!("conectar - type /help for commands, /exit to quit");
    println!("API: {}", ctx.config.base_url());
    console.navigate(initial_route(&ctx));

    loop {
        match rl.readline(&format!("{} > ", console.current())) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                rl.add_history_entry(line)?;

                if !line.starts_with('/') {
                    println!("Commands start with '/'. Type /help for commands.");
                    continue;
                }
                if console.handle_command(&mut rl, line) {
                    break;
                }
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("Input error: {}", e);
                break;
            }
        }
    }

    Ok(())
}
