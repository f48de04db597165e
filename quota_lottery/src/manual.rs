/*!

This is the long-form manual for `quota_lottery` and `qlottery`.

## How the lottery works

A pool has a number of slots and a list of candidates. Each candidate belongs to exactly one
category. The categories are ranked: `Aluno` (students) first, then `Servidor` (staff), then
`Comunidade Externa` (external community).

1. Each category receives a quota: the integer part of its share of the slots. The slots lost to
   rounding go one by one to the categories, in priority order.
2. In each category, the quota is drawn at random among the candidates of this category. The
   candidates that are not drawn form the waitlist of the category, in random order.
3. If a category does not have enough candidates to fill its quota, the missing slots are given
   to the front of the waitlists, starting with the highest priority category that still has
   candidates waiting.
4. The admitted candidates are listed category by category, in priority order. So is the
   waitlist.

The random generator is seeded with the seed given by the user: running the same lottery twice
with the same seed gives exactly the same lists.

## Lottery per group

When the candidates apply to different groups (classes, sections, ...), each group can run its
own lottery with its own number of slots. The shares of the categories are the same for all the
groups, but a group may only accept some categories: the candidates of the other categories are
then left out of this group and the shares of the accepted categories are rescaled.

Each group uses its own seed, derived from the global seed and the name of the group with
SHA-256. The outcome of a group does not depend on the other groups.

## Input formats

The following formats are supported:
* `csv` Comma Separated Values (default)
* `xlsx` Excel workbook. The first worksheet is read, unless `--excel-worksheet-name` is given.

In both cases, the first row holds the column names. Two layouts are recognized.

### Simple layout

```text
id,nome,categoria,turma
1,Ana,Aluno,A
2,Bruno,Servidor,A
3,Carla,Comunidade Externa,B
```

The `id`, `nome` and `categoria` columns are mandatory. The category must be written exactly as
above. The `turma` column (the group) is optional.

### Registration layout

This is the layout of the exports of the registration system. It is used as soon as the
columns `Turma [Vaga]` and `Nome [Candidato]` are both present.

| Column                       | Meaning                                                 |
|------------------------------|---------------------------------------------------------|
| `Turma [Vaga]`               | the group                                               |
| `Nome [Candidato]`           | the name                                                |
| `Id [Candidato]`             | the identifier (optional)                               |
| `Numero`                     | the registration number, copied to the output           |
| `Aluno [Candidato]`, `Servidor [Candidato]`, `Externo [Candidato]` | the category flags |
| `Aluno [Vaga]`, `Servidor [Vaga]`, `Externo [Vaga]` | the categories accepted by the group |
| `Quantidade vagas [Vaga]`    | the number of slots of the group                        |

The category of a candidate is the first flag set to true (`true`, `1`, `sim`, `yes` or `y`),
in priority order. A candidate without any flag is counted as `Comunidade Externa`.

## Output format

The admitted and waitlisted lists are written as CSV files with the columns
`Id [Candidato]`, `Número de sorteio`, `Nome [Candidato]`, `Turma [Vaga]` and `Categoria`.

In per-group mode, `--out-admitted base` writes one file per group, named
`base_<group>_aprovados.csv` (and `base_<group>_espera.csv` for the waitlist). The
consolidated outputs gather all the groups in a single file, sorted by group name.

## Configuration

All the settings can also be given in a JSON file with `--config`. The options passed on the
command line take precedence over the file.

```json
{
  "input": "candidatos.csv",
  "slots": 30,
  "shares": { "student": 0.5, "staff": 0.3, "external": 0.2 },
  "seed": 2024,
  "perGroup": true,
  "groupSlots": { "Turma A": 20, "Turma B": 10 },
  "outputs": {
    "admitted": "out/aprovados",
    "waitlisted": "out/espera",
    "summary": "out/summary.json"
  }
}
```

Relative paths are relative to the directory of the configuration file.

## Checking a previous draw

`--summary` writes a JSON summary of the draw (the settings, and for each pool the quotas and
the ordered identifiers). Passing a previous summary with `--reference` runs the lottery again
and fails if the outcome differs, printing the differences.

 */
