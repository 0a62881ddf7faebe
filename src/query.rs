//! Extraction query for the movies index.
//!
//! The query text is a template with exactly one substitution point: the
//! watermark. The substituted value is always a watermark that was parsed
//! and re-rendered as RFC 3339 beforehand, so no un-validated text ever
//! reaches the SQL.

use sync_core::Watermark;

const WATERMARK_SLOT: &str = "{watermark}";

/// Joins one film with its genres and credited people, computes the
/// effective modification time as the maximum over the film and all joined
/// rows, and selects films modified strictly after the watermark in
/// ascending effective-modified order.
const MOVIES_QUERY: &str = r#"
SELECT
    film.id,
    film.rating::double precision AS imdb_rating,
    film.title,
    film.description,
    ARRAY_AGG(DISTINCT genre.name) FILTER (WHERE genre.name IS NOT NULL) AS genre,
    ARRAY_AGG(DISTINCT person.full_name) FILTER (WHERE person_film.role = 'director') AS director,
    ARRAY_AGG(DISTINCT person.full_name) FILTER (WHERE person_film.role = 'actor') AS actors_names,
    ARRAY_AGG(DISTINCT person.full_name) FILTER (WHERE person_film.role = 'writer') AS writers_names,
    JSONB_AGG(DISTINCT jsonb_build_object('id', person.id, 'name', person.full_name)) FILTER (WHERE person_film.role = 'actor') AS actors,
    JSONB_AGG(DISTINCT jsonb_build_object('id', person.id, 'name', person.full_name)) FILTER (WHERE person_film.role = 'writer') AS writers,
    GREATEST(film.modified, MAX(person.modified), MAX(genre.modified)) AS modified
FROM content.film_work film
    LEFT JOIN content.genre_film_work AS genre_film ON film.id = genre_film.film_work_id
    LEFT JOIN content.genre AS genre ON genre_film.genre_id = genre.id
    LEFT JOIN content.person_film_work AS person_film ON film.id = person_film.film_work_id
    LEFT JOIN content.person AS person ON person_film.person_id = person.id
WHERE
    GREATEST(film.modified, person.modified, genre.modified) > '{watermark}'
GROUP BY film.id
ORDER BY GREATEST(film.modified, MAX(person.modified), MAX(genre.modified)) ASC
"#;

/// Render the movies extraction query for records with effective-modified
/// strictly greater than `watermark`.
pub fn movies_query(watermark: &Watermark) -> String {
    MOVIES_QUERY.replace(WATERMARK_SLOT, &watermark.to_rfc3339())
}
