//! Self-contained HTML catalog page.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use itertools::Itertools;

use crate::catalog::{Catalog, CatalogEntry};

/// Default report file name inside the catalog directory.
pub const REPORT_FILENAME: &str = "1. Catalog.html";

const STYLE: &str = r##"
    body { font-family: sans-serif; margin: 20px; }
    table { width: 100%; border-collapse: collapse; margin-top: 20px; }
    th, td { border: 1px solid #ddd; padding: 8px; text-align: left; vertical-align: top; }
    th { background-color: #f4f4f4; }
    th.sortable { cursor: pointer; }
    th.asc::after { content: " \25B2"; }
    th.desc::after { content: " \25BC"; }
    td img { width: 100px; height: auto; cursor: pointer; }
    .filters { margin: 20px 0; display: flex; flex-wrap: wrap; gap: 20px; align-items: center; }
    .filter-group { display: flex; align-items: center; gap: 10px; }
    .filter-group input[type=number] { width: 75px; }
    select, input { padding: 5px; border-radius: 4px; border: 1px solid #ddd; }
    .rating-high { font-weight: bold; background: #0099298f; }
    .rating-good { font-weight: bold; background: #60e90c82; }
    .rating-medium { font-weight: bold; color: #585858; }
    .rating-low { font-weight: bold; color: #000000; }
    .modal { display: none; position: fixed; z-index: 1; left: 0; top: 0; width: 100%; height: 100%; background-color: rgba(0, 0, 0, 0.9); }
    .modal-content { margin: auto; display: block; height: 100%; }
    .close { position: absolute; top: 15px; right: 35px; color: #fff; font-size: 40px; font-weight: bold; cursor: pointer; }
"##;

const SCRIPT: &str = r##"
    let sortColumn = -1;
    let sortOrder = "asc";

    function sortTable(column) {
        const table = document.getElementById("movieTable");
        const rows = Array.from(table.tBodies[0].rows);
        if (sortColumn === column) {
            sortOrder = sortOrder === "asc" ? "desc" : "asc";
        } else {
            sortColumn = column;
            sortOrder = "asc";
        }
        const direction = sortOrder === "asc" ? 1 : -1;
        rows.sort((a, b) => {
            const aCell = a.cells[column];
            const bCell = b.cells[column];
            const aValue = aCell.dataset.sort;
            const bValue = bCell.dataset.sort;
            if (aValue !== undefined && bValue !== undefined) {
                const aNumber = aValue === "" ? -Infinity : parseFloat(aValue);
                const bNumber = bValue === "" ? -Infinity : parseFloat(bValue);
                if (aNumber === bNumber) {
                    return 0;
                }
                return (aNumber < bNumber ? -1 : 1) * direction;
            }
            return aCell.innerText.localeCompare(bCell.innerText) * direction;
        });
        table.tBodies[0].append(...rows);
        document.querySelectorAll("#movieTable th").forEach((header, index) => {
            header.classList.remove("asc", "desc");
            if (index === column) {
                header.classList.add(sortOrder);
            }
        });
    }

    function filterTable() {
        const name = document.getElementById("nameFilter").value.toLowerCase();
        const yearFrom = parseInt(document.getElementById("yearFrom").value);
        const yearTo = parseInt(document.getElementById("yearTo").value);
        const genre = document.getElementById("genreFilter").value;
        const country = document.getElementById("countryFilter").value;
        document.querySelectorAll("#movieTable tbody tr").forEach(row => {
            const year = parseInt(row.dataset.year);
            const genres = row.dataset.genres ? row.dataset.genres.split("|") : [];
            const countries = row.dataset.countries ? row.dataset.countries.split("|") : [];
            const visible =
                (!name || row.dataset.title.toLowerCase().includes(name)) &&
                (isNaN(yearFrom) || (!isNaN(year) && year >= yearFrom)) &&
                (isNaN(yearTo) || (!isNaN(year) && year <= yearTo)) &&
                (!genre || genres.includes(genre)) &&
                (!country || countries.includes(country));
            row.style.display = visible ? "" : "none";
        });
    }

    function openModal(source) {
        document.getElementById("posterImage").src = source;
        document.getElementById("posterModal").style.display = "block";
    }

    function closeModal() {
        document.getElementById("posterModal").style.display = "none";
    }

    document.addEventListener("keydown", event => {
        if (event.key === "Escape") {
            closeModal();
        }
    });
"##;

/// Write the catalog page to the given path.
///
/// # Errors
/// Returns an error if the file cannot be written.
pub fn write_report(path: &Path, catalog: &Catalog) -> Result<()> {
    fs::write(path, render_report(catalog)).with_context(|| format!("Failed to write report: {}", path.display()))
}

/// Render the catalog as a single HTML document with inline CSS and JS.
#[must_use]
pub fn render_report(catalog: &Catalog) -> String {
    let mut html = String::with_capacity(16 * 1024 + catalog.len() * 1024);

    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("<meta charset=\"UTF-8\">\n");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n");
    html.push_str("<title>Movie Catalog</title>\n");
    let _ = writeln!(html, "<style>{STYLE}</style>");
    let _ = writeln!(html, "<script>{SCRIPT}</script>");
    html.push_str("</head>\n<body>\n<h1>Movie Catalog</h1>\n");
    let _ = writeln!(
        html,
        "<h3>Movies: {}, total duration: {}</h3>",
        catalog.len(),
        catalog.total_duration_display()
    );

    render_filters(&mut html, catalog);
    render_table(&mut html, catalog);

    html.push_str(
        "<div id=\"posterModal\" class=\"modal\" onclick=\"closeModal()\">\n\
         <span class=\"close\">&times;</span>\n\
         <img class=\"modal-content\" id=\"posterImage\" alt=\"\">\n\
         </div>\n",
    );
    html.push_str("</body>\n</html>\n");
    html
}

fn render_filters(html: &mut String, catalog: &Catalog) {
    html.push_str("<div class=\"filters\">\n");
    html.push_str(
        "<div class=\"filter-group\">\
         <label for=\"nameFilter\">Title:</label>\
         <input type=\"text\" id=\"nameFilter\" oninput=\"filterTable()\"></div>\n",
    );
    html.push_str(
        "<div class=\"filter-group\">\
         <label for=\"yearFrom\">Year:</label>\
         <input type=\"number\" id=\"yearFrom\" oninput=\"filterTable()\">\
         <label for=\"yearTo\">-</label>\
         <input type=\"number\" id=\"yearTo\" oninput=\"filterTable()\"></div>\n",
    );
    render_select(html, "genreFilter", "Genre:", "All genres", &catalog.genres());
    render_select(html, "countryFilter", "Country:", "All countries", &catalog.countries());
    html.push_str("</div>\n");
}

fn render_select(html: &mut String, id: &str, label: &str, all_label: &str, options: &[String]) {
    let _ = writeln!(
        html,
        "<div class=\"filter-group\"><label for=\"{id}\">{label}</label><select id=\"{id}\" onchange=\"filterTable()\">"
    );
    let _ = writeln!(html, "<option value=\"\">{all_label}</option>");
    for option in options {
        let option = escape_html(option);
        let _ = writeln!(html, "<option value=\"{option}\">{option}</option>");
    }
    html.push_str("</select></div>\n");
}

fn render_table(html: &mut String, catalog: &Catalog) {
    html.push_str("<table id=\"movieTable\">\n<thead>\n<tr>");
    html.push_str("<th class=\"sortable\" onclick=\"sortTable(0)\">Title</th>");
    html.push_str("<th class=\"sortable\" onclick=\"sortTable(1)\">Year</th>");
    html.push_str("<th>Description</th>");
    html.push_str("<th>Genre</th>");
    html.push_str("<th class=\"sortable\" onclick=\"sortTable(4)\">Rating</th>");
    html.push_str("<th class=\"sortable\" onclick=\"sortTable(5)\">Duration, min</th>");
    html.push_str("<th>Country</th>");
    html.push_str("<th>Poster</th>");
    html.push_str("</tr>\n</thead>\n<tbody>\n");
    for entry in catalog.entries() {
        render_row(html, entry);
    }
    html.push_str("</tbody>\n</table>\n");
}

fn render_row(html: &mut String, entry: &CatalogEntry) {
    let title = escape_html(&entry.title);
    let year = entry.year.map(|year| year.to_string()).unwrap_or_default();

    let _ = writeln!(
        html,
        "<tr data-title=\"{title}\" data-year=\"{year}\" data-genres=\"{}\" data-countries=\"{}\">",
        escape_html(&entry.genres.join("|")),
        escape_html(&entry.countries.join("|")),
    );

    match &entry.link {
        Some(link) => {
            let _ = writeln!(
                html,
                "<td title=\"{}\"><a href=\"{}\">{title}</a></td>",
                escape_html(&entry.file_name),
                escape_html(link)
            );
        }
        None => {
            let _ = writeln!(html, "<td title=\"{}\">{title}</td>", escape_html(&entry.file_name));
        }
    }
    let _ = writeln!(html, "<td data-sort=\"{year}\">{}</td>", entry.year_display());
    let _ = writeln!(html, "<td>{}</td>", escape_html(&entry.description));
    let _ = writeln!(html, "<td>{}</td>", escape_html(&entry.genres_display()));

    let rating_sort = entry.rating.map(|rating| format!("{rating:.2}")).unwrap_or_default();
    match entry.rating.map(rating_class) {
        Some(class) => {
            let _ = writeln!(
                html,
                "<td class=\"{class}\" data-sort=\"{rating_sort}\">{}</td>",
                entry.rating_display()
            );
        }
        None => {
            let _ = writeln!(html, "<td data-sort=\"\">{}</td>", entry.rating_display());
        }
    }

    let duration_sort = entry.duration.map(|minutes| minutes.to_string()).unwrap_or_default();
    let _ = writeln!(html, "<td data-sort=\"{duration_sort}\">{}</td>", entry.duration_display());
    let _ = writeln!(html, "<td>{}</td>", escape_html(&entry.countries_display()));

    match &entry.poster {
        Some(poster) => {
            let source = escape_html(&encode_path(poster));
            let _ = writeln!(
                html,
                "<td><img src=\"{source}\" data-full=\"{source}\" alt=\"{title}\" loading=\"lazy\" onclick=\"openModal(this.dataset.full)\"></td>"
            );
        }
        None => html.push_str("<td></td>\n"),
    }
    html.push_str("</tr>\n");
}

/// CSS class for a rating value.
fn rating_class(rating: f64) -> &'static str {
    if rating > 8.0 {
        "rating-high"
    } else if rating > 7.0 {
        "rating-good"
    } else if rating > 5.0 {
        "rating-medium"
    } else {
        "rating-low"
    }
}

/// Escape text for use in HTML content and double-quoted attribute values.
#[must_use]
pub fn escape_html(text: &str) -> String {
    html_escape::encode_double_quoted_attribute(text).into_owned()
}

/// Percent-encode each segment of a relative path for use in a URL.
fn encode_path(path: &str) -> String {
    path.split('/').map(urlencoding::encode).join("/")
}
