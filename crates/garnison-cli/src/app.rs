//! Command implementations.
//!
//! `App` owns the configuration and session and builds an `ApiClient` for
//! them. Every command fetches fresh data; nothing is cached between runs
//! besides the session itself.

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use garnison_core::filter::{filter, group_by, sort_people, sort_remarks_by_date, Searchable};
use garnison_core::models::{InstructorDossier, Remark, RemarkDraft, TraineeDossier};
use garnison_core::report::{load_assets, ReportRequest};
use garnison_core::{
    compute_statistics, render_report, ApiClient, Config, CredentialStore, FilterSpec, Period,
    PersonSortColumn, RenderOptions, Session,
};

use crate::output;
use crate::Entity;

pub struct App {
    config: Config,
    session: Session,
}

impl App {
    pub fn new() -> Result<Self> {
        let config = Config::load().context("Failed to load configuration")?;
        let mut session = Session::new(config.cache_dir()?);
        match session.load() {
            Ok(true) => debug!("Loaded saved session"),
            Ok(false) => debug!("No valid saved session"),
            Err(e) => warn!(error = %e, "Ignoring unreadable session file"),
        }
        Ok(Self { config, session })
    }

    /// Client carrying the saved session; fails when logged out
    fn client(&self) -> Result<ApiClient> {
        let session = self.session.require()?.clone();
        ApiClient::new(&self.config.api_url()?, Some(session))
    }

    // ===== Session =====

    pub async fn login(&mut self, username: Option<String>, remember: bool) -> Result<()> {
        let username = match username.or_else(|| self.config.last_username.clone()) {
            Some(u) => u,
            None => prompt("Identifiant : ")?,
        };

        let stored = if remember {
            None
        } else {
            CredentialStore::get_password(&username).ok()
        };
        let password = match stored {
            Some(p) => {
                info!(username = %username, "Using password from keychain");
                p
            }
            None => rpassword::prompt_password("Mot de passe : ").context("Failed to read password")?,
        };

        let client = ApiClient::new(&self.config.api_url()?, None)?;
        let data = client.authenticate(&username, &password).await?;

        if remember {
            if let Err(e) = CredentialStore::store(&username, &password) {
                warn!(error = %e, "Could not save password to keychain");
            }
        }

        println!(
            "Connecté en tant que {} (session valable {} jours)",
            data.username,
            data.days_until_expiry()
        );
        self.session.update(data);
        self.session.save()?;
        self.config.last_username = Some(username);
        self.config.save()?;
        Ok(())
    }

    pub fn logout(&mut self, forget: bool) -> Result<()> {
        if forget {
            if let Some(username) = self.config.last_username.as_deref() {
                if let Err(e) = CredentialStore::delete(username) {
                    warn!(error = %e, "No keychain entry removed");
                }
            }
        }
        self.session.clear()?;
        println!("Déconnecté.");
        Ok(())
    }

    // ===== Listing =====

    pub async fn list(
        &self,
        entity: Entity,
        spec: &FilterSpec,
        sort: Option<&str>,
        descending: bool,
        json: bool,
    ) -> Result<()> {
        let client = self.client()?;
        let column: PersonSortColumn = match sort {
            Some(s) => s.parse().map_err(anyhow::Error::msg)?,
            None => PersonSortColumn::default(),
        };

        match entity {
            Entity::Trainees => {
                let trainees = client.fetch_trainees().await?;
                let mut rows = filter(&trainees, spec);
                sort_people(&mut rows, column, !descending);
                emit(&rows, json, |rows| output::trainees(rows))
            }
            Entity::Instructors => {
                let instructors = client.fetch_instructors().await?;
                let mut rows = filter(&instructors, spec);
                sort_people(&mut rows, column, !descending);
                emit(&rows, json, |rows| output::instructors(rows))
            }
            Entity::Subjects => {
                let subjects = client.fetch_subjects().await?;
                let rows = filter(&subjects, spec);
                emit(&rows, json, |rows| output::subjects(rows))
            }
            Entity::Remarks => {
                let remarks = client.fetch_remarks().await?;
                let mut rows = filter(&remarks, spec);
                sort_remarks_by_date(&mut rows, !descending);
                emit(&rows, json, |rows| output::remarks(rows))
            }
            Entity::Consultations => {
                let consultations = client.fetch_consultations().await?;
                let rows = filter(&consultations, spec);
                emit(&rows, json, |rows| output::consultations(rows))
            }
            Entity::Specialties => {
                let specialties = client.fetch_specialties().await?;
                emit(&specialties.iter().collect::<Vec<_>>(), json, |rows| {
                    output::specialties(rows)
                })
            }
        }
    }

    pub async fn remarks(&self, spec: &FilterSpec) -> Result<()> {
        let remarks = self.client()?.fetch_remarks().await?;
        let mut rows = filter(&remarks, spec);
        sort_remarks_by_date(&mut rows, true);
        let groups = group_by(&rows, |r| output::day_heading(r));
        if groups.is_empty() {
            println!("Aucune remarque.");
        }
        for (day, group) in &groups {
            println!("\n== {} ({}) ==", day, group.len());
            let group: Vec<&Remark> = group.iter().map(|r| **r).collect();
            output::remarks(&group);
        }
        Ok(())
    }

    pub async fn stats(&self, period: &str, json: bool) -> Result<()> {
        let period: Period = period.parse().map_err(anyhow::Error::msg)?;
        let remarks = self.client()?.fetch_remarks().await?;
        let summary = compute_statistics(&remarks, &period);

        if json {
            println!("{}", serde_json::to_string_pretty(&summary)?);
            return Ok(());
        }
        match summary {
            Some(summary) => output::statistics(&summary),
            None => println!("Aucune donnée pour {}.", period.label()),
        }
        Ok(())
    }

    // ===== Reports =====

    pub async fn trainee_sheets(&self, spec: &FilterSpec, ids: &[i64]) -> Result<ReportRequest> {
        let client = self.client()?;
        let (trainees, remarks, consultations, punishments, permissions) = tokio::try_join!(
            client.fetch_trainees(),
            client.fetch_remarks(),
            client.fetch_consultations(),
            client.fetch_punishments(),
            client.fetch_permissions(),
        )?;

        let mut selected = select(&trainees, spec, ids, |t| t.id);
        sort_people(&mut selected, PersonSortColumn::Name, true);
        let dossiers = selected
            .into_iter()
            .map(|t| {
                TraineeDossier::collect(
                    t.clone(),
                    &remarks,
                    &consultations,
                    &punishments,
                    &permissions,
                )
            })
            .collect();
        Ok(ReportRequest::TraineeSheets(dossiers))
    }

    pub async fn instructor_sheets(&self, spec: &FilterSpec, ids: &[i64]) -> Result<ReportRequest> {
        let client = self.client()?;
        let (instructors, remarks) =
            tokio::try_join!(client.fetch_instructors(), client.fetch_remarks())?;

        let mut selected = select(&instructors, spec, ids, |i| i.id);
        sort_people(&mut selected, PersonSortColumn::Name, true);
        let dossiers = selected
            .into_iter()
            .map(|i| InstructorDossier::collect(i.clone(), &remarks))
            .collect();
        Ok(ReportRequest::InstructorSheets(dossiers))
    }

    pub async fn remarks_list(&self, spec: &FilterSpec, title: String) -> Result<ReportRequest> {
        let remarks = self.client()?.fetch_remarks().await?;
        let remarks = filter(&remarks, spec).into_iter().cloned().collect();
        Ok(ReportRequest::RemarksList { title, remarks })
    }

    pub async fn statistics(&self, period: &str) -> Result<ReportRequest> {
        let period: Period = period.parse().map_err(anyhow::Error::msg)?;
        let remarks = self.client()?.fetch_remarks().await?;
        let summary = compute_statistics(&remarks, &period);
        Ok(ReportRequest::InstructorStatistics { period, summary })
    }

    pub async fn certificate(&self, period: &str) -> Result<ReportRequest> {
        let period: Period = period.parse().map_err(anyhow::Error::msg)?;
        let remarks = self.client()?.fetch_remarks().await?;
        let summary = compute_statistics(&remarks, &period)
            .ok_or_else(|| anyhow::anyhow!("Aucune remarque pour {}", period.label()))?;
        Ok(ReportRequest::Certificate(summary))
    }

    /// Fetch the report's images, render it and write it out
    pub async fn export(&self, request: &ReportRequest, output: Option<PathBuf>) -> Result<()> {
        let client = self.client()?;
        let plan = request.asset_plan(
            self.config.logo_url.as_deref(),
            self.config.border_url.as_deref(),
        );
        let assets = load_assets(&client, &plan).await;

        let options = RenderOptions::new(self.config.letterhead.clone());
        let report = render_report(request, &options, &assets)?;

        let dir = output.unwrap_or_else(|| self.config.output_dir());
        let path = report
            .save_in(&dir)
            .with_context(|| format!("Failed to write report into {}", dir.display()))?;
        println!("{} ({} page(s))", path.display(), report.page_count);
        Ok(())
    }

    // ===== Writes =====

    pub async fn submit_remarks(&self, file: &Path) -> Result<()> {
        let contents = std::fs::read_to_string(file)
            .with_context(|| format!("Failed to read {}", file.display()))?;
        let drafts: Vec<RemarkDraft> = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse remark drafts in {}", file.display()))?;
        if drafts.is_empty() {
            println!("Aucune remarque à envoyer.");
            return Ok(());
        }

        let report = self.client()?.create_remarks(&drafts).await?;
        for (index, outcome) in report.outcomes.iter().enumerate() {
            match outcome {
                Ok(remark) => println!("#{} créée (id {})", index + 1, output::id(remark.id)),
                Err(e) => println!("#{} échec : {}", index + 1, e),
            }
        }
        let created = report.into_result()?;
        println!("{} remarque(s) créée(s).", created.len());
        Ok(())
    }
}

/// Filter, then keep only `ids` when given
fn select<'a, T: Searchable>(
    records: &'a [T],
    spec: &FilterSpec,
    ids: &[i64],
    id_of: impl Fn(&T) -> Option<i64>,
) -> Vec<&'a T> {
    filter(records, spec)
        .into_iter()
        .filter(|r| ids.is_empty() || id_of(r).map(|id| ids.contains(&id)).unwrap_or(false))
        .collect()
}

fn emit<T: serde::Serialize>(rows: &[&T], json: bool, table: impl FnOnce(&[&T])) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(rows)?);
    } else {
        table(rows);
        println!("{} enregistrement(s)", rows.len());
    }
    Ok(())
}

fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    let value = line.trim().to_string();
    if value.is_empty() {
        anyhow::bail!("Identifiant requis");
    }
    Ok(value)
}
